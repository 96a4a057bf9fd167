mod model;

use pest::Parser as _;
use pest::iterators::Pair;
use pest_derive::Parser;
use thiserror::Error;

pub use model::*;

#[derive(Parser)]
#[grammar = "resources/path_template.pest"] // Path relative to the crate root
pub struct TemplateParser;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("path template must not be empty")]
    Empty,
    #[error("path template `{0}` must start with `/`")]
    MissingLeadingSlash(String),
    #[error("`:` must only be used to separate segments from the verb: `{0}`")]
    MultipleVerbSeparators(String),
    #[error("unsupported `{segment}` wildcard segment in `{template}`")]
    UnsupportedWildcard { template: String, segment: String },
    #[error("malformed path template `{template}`: {source}")]
    Grammar {
        template: String,
        #[source]
        source: Box<pest::error::Error<Rule>>,
    },
    #[error("{0}")]
    Message(&'static str),
}

impl TemplateError {
    /// Unsupported-feature conditions degrade to a skipped binding instead of
    /// failing the whole file; everything else is a configuration error.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, TemplateError::UnsupportedWildcard { .. })
    }
}

/// Public API: parse one HTTP path pattern into a [`PathTemplate`].
pub fn parse(template: &str) -> Result<PathTemplate, TemplateError> {
    let trimmed = template.trim();
    if trimmed.is_empty() {
        return Err(TemplateError::Empty);
    }
    if !trimmed.starts_with('/') {
        return Err(TemplateError::MissingLeadingSlash(template.to_string()));
    }
    // The verb separator may appear at most once in the whole template.
    if trimmed.matches(':').count() > 1 {
        return Err(TemplateError::MultipleVerbSeparators(template.to_string()));
    }

    let mut pairs =
        TemplateParser::parse(Rule::template, trimmed).map_err(|e| TemplateError::Grammar {
            template: template.to_string(),
            source: Box::new(e),
        })?;
    let root = pairs
        .next()
        .ok_or(TemplateError::Message("expected template root"))?;

    let mut segments = Vec::new();
    let mut verb = None;
    for pair in root.into_inner() {
        match pair.as_rule() {
            Rule::segment => segments.push(parse_segment(pair, trimmed)?),
            Rule::verb => {
                verb = pair
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::literal)
                    .map(|p| p.as_str().to_string());
            }
            Rule::EOI => {}
            _ => {}
        }
    }

    let bound_variables = segments
        .iter()
        .filter_map(|s| s.field_path().map(str::to_string))
        .collect();

    Ok(PathTemplate {
        segments,
        verb,
        bound_variables,
    })
}

fn parse_segment(pair: Pair<Rule>, template: &str) -> Result<Segment, TemplateError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or(TemplateError::Message("expected segment body"))?;
    match inner.as_rule() {
        Rule::literal => Ok(Segment::Literal(inner.as_str().to_string())),
        Rule::wildcard => Err(TemplateError::UnsupportedWildcard {
            template: template.to_string(),
            segment: inner.as_str().to_string(),
        }),
        Rule::variable => {
            let mut field_path: Option<String> = None;
            let mut assignment: Option<String> = None;
            for p in inner.into_inner() {
                match p.as_rule() {
                    Rule::field_path => field_path = Some(p.as_str().to_string()),
                    Rule::assignment => assignment = Some(p.as_str().to_string()),
                    _ => {}
                }
            }
            let field_path =
                field_path.ok_or(TemplateError::Message("variable segment without field path"))?;
            if assignment.is_some() {
                // Keep the field path, drop the sub-pattern.
                tracing::warn!(
                    template,
                    variable = %field_path,
                    "unsupported assignment of segment to variable, ignoring sub-pattern"
                );
            }
            Ok(Segment::Variable { field_path })
        }
        _ => Err(TemplateError::Message("unexpected segment rule")),
    }
}
