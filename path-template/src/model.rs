use std::collections::HashSet;

use heck::ToLowerCamelCase;

/// One parsed segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A literal path component, matched verbatim.
    Literal(String),
    /// A `{field.path}` variable binding a request-message field.
    Variable { field_path: String },
}

impl Segment {
    pub fn field_path(&self) -> Option<&str> {
        match self {
            Segment::Literal(_) => None,
            Segment::Variable { field_path } => Some(field_path),
        }
    }
}

/// A parsed `google.api.http` path template.
///
/// Holds the ordered segments, the optional trailing verb and the set of
/// field paths bound by `{...}` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    pub(crate) segments: Vec<Segment>,
    pub(crate) verb: Option<String>,
    pub(crate) bound_variables: HashSet<String>,
}

impl PathTemplate {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn verb(&self) -> Option<&str> {
        self.verb.as_deref()
    }

    /// The set of all field paths appearing in variable segments.
    pub fn bound_variables(&self) -> &HashSet<String> {
        &self.bound_variables
    }

    /// The normalized route path: variable segments are rewritten to a single
    /// camelCase placeholder token, e.g. `/v1/users/{user_id}` becomes
    /// `/v1/users/{userId}`.
    pub fn route_path(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(literal) => out.push_str(literal),
                Segment::Variable { field_path } => {
                    out.push('{');
                    out.push_str(&variable_for_path(field_path));
                    out.push('}');
                }
            }
        }
        out
    }
}

/// The camelCase placeholder name for a dotted field path:
/// `foo_bar.baz` becomes `fooBarBaz`.
pub fn variable_for_path(path: &str) -> String {
    path.replace('.', "_").to_lower_camel_case()
}
