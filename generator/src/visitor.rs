//! Field classification for a request message.
//!
//! Walks the input message tree in declaration order and splits the reachable
//! leaf fields into path-bound fields (named by a template variable) and free
//! fields (query-parameter candidates). The walk carries an explicit name
//! stack; a field is matched against the bound set by its dotted textual
//! path, exactly as it appears between the template braces.

use std::collections::HashSet;

use crate::error::GenerateError;
use crate::registry::{FieldDescriptor, FieldKind, Registry};

/// A leaf field together with the dotted path that reaches it from the
/// request message root.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedField {
    pub path: Vec<String>,
    pub field: FieldDescriptor,
}

impl ClassifiedField {
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

/// The outcome of classifying one request message against one template.
#[derive(Debug, Default)]
pub struct Classification {
    pub path_fields: Vec<ClassifiedField>,
    pub free_fields: Vec<ClassifiedField>,
}

/// Classify every reachable leaf field of `message_name`.
///
/// Singular message fields are traversed; well-known string types, map
/// fields and repeated message fields stay leaves. Path-bound fields are
/// never traversed, whatever their kind.
pub fn classify(
    registry: &Registry,
    message_name: &str,
    bound: &HashSet<String>,
) -> Result<Classification, GenerateError> {
    let mut classifier = Classifier {
        registry,
        bound,
        name_stack: Vec::new(),
        type_stack: Vec::new(),
        out: Classification::default(),
    };
    classifier.visit_message(message_name)?;
    Ok(classifier.out)
}

struct Classifier<'a> {
    registry: &'a Registry,
    bound: &'a HashSet<String>,
    name_stack: Vec<String>,
    /// Qualified names of the messages currently being traversed, to cut
    /// recursive type cycles.
    type_stack: Vec<String>,
    out: Classification,
}

impl Classifier<'_> {
    fn visit_message(&mut self, message_name: &str) -> Result<(), GenerateError> {
        let message = self.registry.resolve_message(message_name)?;
        self.type_stack.push(message.qualified_name.clone());
        for field in &message.fields {
            self.visit_field(field)?;
        }
        self.type_stack.pop();
        Ok(())
    }

    fn visit_field(&mut self, field: &FieldDescriptor) -> Result<(), GenerateError> {
        self.name_stack.push(field.name.clone());
        let dotted = self.name_stack.join(".");

        if self.bound.contains(&dotted) {
            self.record(field, true);
        } else if self.should_traverse(field)? {
            let FieldKind::Message(target) = &field.kind else {
                unreachable!("only message fields are traversed");
            };
            let target = target.clone();
            if self.type_stack.contains(&self.registry.resolve_message(&target)?.qualified_name) {
                tracing::debug!(
                    field = %dotted,
                    message = %target,
                    "skipping recursive message field"
                );
            } else {
                self.visit_message(&target)?;
            }
        } else {
            self.record(field, false);
        }

        self.name_stack.pop();
        Ok(())
    }

    fn should_traverse(&self, field: &FieldDescriptor) -> Result<bool, GenerateError> {
        if field.is_well_known_string() || field.is_repeated() {
            return Ok(false);
        }
        Ok(matches!(field.kind, FieldKind::Message(_)))
    }

    fn record(&mut self, field: &FieldDescriptor, path_bound: bool) {
        let classified = ClassifiedField {
            path: self.name_stack.clone(),
            field: field.clone(),
        };
        if path_bound {
            self.out.path_fields.push(classified);
        } else {
            self.out.free_fields.push(classified);
        }
    }
}
