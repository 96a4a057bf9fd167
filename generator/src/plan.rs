//! The transcoding plan: the ordered request-population steps of one binding.
//!
//! A plan is computed once per binding at generation time and then rendered
//! verbatim; nothing here touches the output language. Step order matters:
//! path steps come last so a path variable overwrites any query or body value
//! for the same field.

use std::collections::HashSet;

use path_template::{PathTemplate, variable_for_path};

use crate::error::GenerateError;
use crate::registry::{FieldKind, Registry, ScalarKind};
use crate::visitor::{ClassifiedField, classify};

/// How a textual path or query value becomes the field's wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// String fields take the raw value.
    Identity,
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float,
    Double,
    /// Case-sensitive lookup against the named enum's values.
    EnumValue(String),
    /// Well-known wrapper built from its canonical string form.
    WellKnownString(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeStep {
    /// Populate a field from a path variable.
    SetFromPath {
        path: Vec<String>,
        variable: String,
        conversion: Conversion,
    },
    /// Populate a field from a query parameter of the same dotted name.
    SetFromQuery {
        path: Vec<String>,
        variable: String,
        conversion: Conversion,
        repeated: bool,
    },
    /// Deserialize the request body into one top-level message field.
    SetFromBodyField { field: String, message_type: String },
    /// Deserialize the request body into the whole request message.
    MergeWholeBody,
}

#[derive(Debug, Default, PartialEq)]
pub struct TranscodingPlan {
    pub steps: Vec<TranscodeStep>,
}

/// Build the plan for one binding of `input_message`.
///
/// `body` is the rule's body selector: `""` routes free fields through the
/// query string, `"*"` consumes the body as the whole message, a field name
/// consumes the body as that single field.
pub fn build_plan(
    registry: &Registry,
    input_message: &str,
    template: &PathTemplate,
    body: &str,
    file: &str,
) -> Result<TranscodingPlan, GenerateError> {
    let classification = classify(registry, input_message, template.bound_variables())?;

    let matched: HashSet<String> = classification
        .path_fields
        .iter()
        .map(ClassifiedField::dotted_path)
        .collect();
    for variable in template.bound_variables() {
        if !matched.contains(variable) {
            return Err(GenerateError::config(
                file,
                format!("path variable `{{{variable}}}` does not name a field of {input_message}"),
            ));
        }
    }

    let mut steps = Vec::new();
    match body {
        "" => {
            for free in &classification.free_fields {
                match query_conversion(registry, free)? {
                    Some(conversion) => steps.push(TranscodeStep::SetFromQuery {
                        path: free.path.clone(),
                        variable: variable_for_path(&free.dotted_path()),
                        conversion,
                        repeated: free.field.is_repeated(),
                    }),
                    None => tracing::debug!(
                        field = %free.dotted_path(),
                        message = %input_message,
                        "field has no query representation, skipping"
                    ),
                }
            }
        }
        "*" => steps.push(TranscodeStep::MergeWholeBody),
        selector => steps.push(body_field_step(registry, input_message, selector, file)?),
    }

    // Path values take precedence over anything the body or query set.
    for bound in &classification.path_fields {
        let conversion = conversion_for(registry, &bound.field).map_err(|message| {
            GenerateError::config(
                file,
                format!("path variable `{{{}}}`: {message}", bound.dotted_path()),
            )
        })?;
        steps.push(TranscodeStep::SetFromPath {
            path: bound.path.clone(),
            variable: variable_for_path(&bound.dotted_path()),
            conversion,
        });
    }

    Ok(TranscodingPlan { steps })
}

fn body_field_step(
    registry: &Registry,
    input_message: &str,
    selector: &str,
    file: &str,
) -> Result<TranscodeStep, GenerateError> {
    if selector.contains('.') {
        return Err(GenerateError::config(
            file,
            format!("body selector `{selector}` must name a top-level field, not a path"),
        ));
    }
    let message = registry.resolve_message(input_message)?;
    let field = message.field(selector).ok_or_else(|| {
        GenerateError::config(
            file,
            format!("body selector `{selector}` does not name a field of {input_message}"),
        )
    })?;
    let FieldKind::Message(target) = &field.kind else {
        return Err(GenerateError::config(
            file,
            format!("body selector `{selector}` must name a message-typed field"),
        ));
    };
    if field.is_repeated() || field.is_map(registry)? {
        return Err(GenerateError::config(
            file,
            format!("body selector `{selector}` must name a singular field"),
        ));
    }
    Ok(TranscodeStep::SetFromBodyField {
        field: selector.to_string(),
        message_type: target.clone(),
    })
}

/// The conversion for a free field, or `None` when the field cannot appear
/// in a query string (singular embedded messages and maps).
fn query_conversion(
    registry: &Registry,
    free: &ClassifiedField,
) -> Result<Option<Conversion>, GenerateError> {
    if matches!(free.field.kind, FieldKind::Message(_)) && !free.field.is_well_known_string() {
        return Ok(None);
    }
    conversion_for(registry, &free.field)
        .map(Some)
        .map_err(GenerateError::Internal)
}

/// The scalar conversion table. The caller decides how a rejection is
/// reported; the message only describes the field.
fn conversion_for(
    registry: &Registry,
    field: &crate::registry::FieldDescriptor,
) -> Result<Conversion, String> {
    match &field.kind {
        FieldKind::Scalar(scalar) => match scalar {
            ScalarKind::String => Ok(Conversion::Identity),
            ScalarKind::Bool => Ok(Conversion::Bool),
            ScalarKind::Int32 | ScalarKind::Sint32 | ScalarKind::Sfixed32 => Ok(Conversion::Int32),
            ScalarKind::Int64 | ScalarKind::Sint64 | ScalarKind::Sfixed64 => Ok(Conversion::Int64),
            ScalarKind::Uint32 | ScalarKind::Fixed32 => Ok(Conversion::Uint32),
            ScalarKind::Uint64 | ScalarKind::Fixed64 => Ok(Conversion::Uint64),
            ScalarKind::Float => Ok(Conversion::Float),
            ScalarKind::Double => Ok(Conversion::Double),
            ScalarKind::Bytes => Err(format!(
                "field `{}` of type bytes has no textual representation",
                field.name
            )),
        },
        FieldKind::Enum(name) => {
            // The enum must be resolvable; its values are looked up by name
            // at request time.
            registry
                .resolve_enum(name)
                .map_err(|e| e.to_string())?;
            Ok(Conversion::EnumValue(name.clone()))
        }
        FieldKind::Message(name) if field.is_well_known_string() => {
            Ok(Conversion::WellKnownString(name.clone()))
        }
        FieldKind::Message(name) => Err(format!(
            "field `{}` of message type {name} cannot be built from a string",
            field.name
        )),
    }
}
