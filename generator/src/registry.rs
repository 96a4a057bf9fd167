//! The descriptor registry.
//!
//! The registry keeps track of already-processed descriptors. Since there are
//! links between the different descriptors (when they reference other messages
//! and/or packages) we need a central place to index descriptor information.
//! All cross-references are by fully-qualified name lookup, never by direct
//! structural embedding, so cyclic message graphs are naturally supported.

use std::collections::HashMap;

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FileDescriptorProto, MethodDescriptorProto,
    ServiceDescriptorProto,
};

use crate::annotations::{FileHttpRules, HttpRule};
use crate::error::GenerateError;

/// Scalar field kinds, as declared in the .proto source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

/// The target type of a field: a scalar, or a named enum/message resolved
/// through the registry. Names keep the leading-dot qualification the
/// compiler presents; [`Registry::resolve`] strips it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Enum(String),
    Message(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    Optional,
    Required,
    Repeated,
}

/// Well-known message types carried as their string form in paths and query
/// parameters instead of being traversed field by field.
const WELL_KNOWN_STRING_TYPES: [&str; 3] = [
    "google.protobuf.Timestamp",
    "google.protobuf.Duration",
    "google.protobuf.FieldMask",
];

pub fn is_well_known_string_type(type_name: &str) -> bool {
    WELL_KNOWN_STRING_TYPES.contains(&type_name.trim_start_matches('.'))
}

/// A single field of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: i32,
    pub label: FieldLabel,
    pub kind: FieldKind,
    /// Index of the owning oneof group, if any.
    pub oneof_index: Option<i32>,
    pub comment: String,
}

impl FieldDescriptor {
    fn from_proto(
        proto: &prost_types::FieldDescriptorProto,
        comment: String,
    ) -> Result<Self, GenerateError> {
        let kind = match proto.r#type() {
            Type::Double => FieldKind::Scalar(ScalarKind::Double),
            Type::Float => FieldKind::Scalar(ScalarKind::Float),
            Type::Int32 => FieldKind::Scalar(ScalarKind::Int32),
            Type::Int64 => FieldKind::Scalar(ScalarKind::Int64),
            Type::Uint32 => FieldKind::Scalar(ScalarKind::Uint32),
            Type::Uint64 => FieldKind::Scalar(ScalarKind::Uint64),
            Type::Sint32 => FieldKind::Scalar(ScalarKind::Sint32),
            Type::Sint64 => FieldKind::Scalar(ScalarKind::Sint64),
            Type::Fixed32 => FieldKind::Scalar(ScalarKind::Fixed32),
            Type::Fixed64 => FieldKind::Scalar(ScalarKind::Fixed64),
            Type::Sfixed32 => FieldKind::Scalar(ScalarKind::Sfixed32),
            Type::Sfixed64 => FieldKind::Scalar(ScalarKind::Sfixed64),
            Type::Bool => FieldKind::Scalar(ScalarKind::Bool),
            Type::String => FieldKind::Scalar(ScalarKind::String),
            Type::Bytes => FieldKind::Scalar(ScalarKind::Bytes),
            Type::Enum => FieldKind::Enum(proto.type_name().to_string()),
            Type::Message => FieldKind::Message(proto.type_name().to_string()),
            Type::Group => {
                return Err(GenerateError::Internal(format!(
                    "proto2 group field {} is not supported",
                    proto.name()
                )));
            }
        };
        let label = match proto.label() {
            Label::Optional => FieldLabel::Optional,
            Label::Required => FieldLabel::Required,
            Label::Repeated => FieldLabel::Repeated,
        };
        Ok(FieldDescriptor {
            name: proto.name().to_string(),
            number: proto.number(),
            label,
            kind,
            oneof_index: proto.oneof_index,
            comment,
        })
    }

    pub fn is_repeated(&self) -> bool {
        self.label == FieldLabel::Repeated
    }

    /// A repeated field whose target is a synthesized map-entry message is
    /// logically a map field, never a repeated message field.
    pub fn is_map(&self, registry: &Registry) -> Result<bool, GenerateError> {
        match &self.kind {
            FieldKind::Message(name) if self.is_repeated() => {
                Ok(registry.resolve_message(name)?.is_map_entry())
            }
            _ => Ok(false),
        }
    }

    /// Key and value kinds of a map field.
    pub fn map_entry_kinds(
        &self,
        registry: &Registry,
    ) -> Result<Option<(FieldKind, FieldKind)>, GenerateError> {
        if !self.is_map(registry)? {
            return Ok(None);
        }
        let FieldKind::Message(name) = &self.kind else {
            return Ok(None);
        };
        let entry = registry.resolve_message(name)?;
        Ok(Some((
            entry.map_key()?.kind.clone(),
            entry.map_value()?.kind.clone(),
        )))
    }

    pub fn is_well_known_string(&self) -> bool {
        matches!(&self.kind, FieldKind::Message(name) if is_well_known_string_type(name))
    }
}

/// A message type: ordered fields (declaration order is load-bearing for
/// deterministic output), nested type names, and the map-entry flag the
/// compiler sets on synthesized `map<k, v>` entry messages.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDescriptor {
    pub name: String,
    pub qualified_name: String,
    pub fields: Vec<FieldDescriptor>,
    /// Qualified names of nested messages and enums, in declaration order.
    pub nested: Vec<String>,
    map_entry: bool,
    pub comment: String,
}

impl MessageDescriptor {
    pub fn is_map_entry(&self) -> bool {
        self.map_entry
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn map_key(&self) -> Result<&FieldDescriptor, GenerateError> {
        self.entry_field(0)
    }

    pub fn map_value(&self) -> Result<&FieldDescriptor, GenerateError> {
        self.entry_field(1)
    }

    fn entry_field(&self, idx: usize) -> Result<&FieldDescriptor, GenerateError> {
        if !self.map_entry {
            return Err(GenerateError::Internal(format!(
                "{} is not a map entry",
                self.qualified_name
            )));
        }
        self.fields.get(idx).ok_or_else(|| {
            GenerateError::Internal(format!(
                "map entry {} is missing field {idx}",
                self.qualified_name
            ))
        })
    }
}

/// An enum type: insertion order of values equals declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    pub name: String,
    pub qualified_name: String,
    pub values: Vec<(String, i32)>,
    pub comment: String,
}

impl EnumDescriptor {
    pub fn value(&self, name: &str) -> Option<i32> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// Streaming mode of an rpc, derived from the two independent flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodType {
    Simple,
    ServerStream,
    ClientStream,
    BiStream,
}

impl MethodType {
    pub fn from_flags(client_streaming: bool, server_streaming: bool) -> Self {
        match (client_streaming, server_streaming) {
            (false, false) => MethodType::Simple,
            (false, true) => MethodType::ServerStream,
            (true, false) => MethodType::ClientStream,
            (true, true) => MethodType::BiStream,
        }
    }
}

/// A single rpc method of a service.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    /// Input message type name as the compiler presents it (leading dot).
    pub input_type: String,
    pub output_type: String,
    pub method_type: MethodType,
    pub http_rule: Option<HttpRule>,
    pub comment: String,
}

/// A service and its ordered methods.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub qualified_name: String,
    /// The .proto file the service was declared in.
    pub proto_file: String,
    pub package: String,
    pub methods: Vec<MethodDescriptor>,
    pub comment: String,
}

#[derive(Debug)]
pub enum Descriptor {
    Message(MessageDescriptor),
    Enum(EnumDescriptor),
    Service(ServiceDescriptor),
}

/// Write-once-per-entry, read-many map from fully-qualified type name to
/// descriptor. Files must be registered in the order the compiler supplies
/// them (a topological order of the dependency graph), so every name a field
/// or method references is present by the time it is looked up.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, Descriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Process one file: all enums, then all top-level messages (recursively,
    /// depth-first), then all services. Returns the qualified names of the
    /// file's services in declaration order.
    pub fn register_file(
        &mut self,
        file: &FileDescriptorProto,
        rules: &FileHttpRules,
    ) -> Result<Vec<String>, GenerateError> {
        let package = file.package().to_string();
        let comments = CommentIndex::new(file);

        for (idx, proto) in file.enum_type.iter().enumerate() {
            self.register_enum(&package, proto, &comments, &[5, idx as i32])?;
        }
        for (idx, proto) in file.message_type.iter().enumerate() {
            self.register_message(&package, proto, &comments, &[4, idx as i32])?;
        }

        let mut services = Vec::with_capacity(file.service.len());
        for (idx, proto) in file.service.iter().enumerate() {
            services.push(self.register_service(
                file,
                &package,
                proto,
                rules,
                &comments,
                idx,
            )?);
        }
        Ok(services)
    }

    fn register_enum(
        &mut self,
        scope: &str,
        proto: &EnumDescriptorProto,
        comments: &CommentIndex,
        path: &[i32],
    ) -> Result<String, GenerateError> {
        let qualified_name = qualify(scope, proto.name());
        let mut values = Vec::with_capacity(proto.value.len());
        for value in &proto.value {
            if values.iter().any(|(n, _)| n == value.name()) {
                return Err(GenerateError::Internal(format!(
                    "duplicate value name {} in enum {qualified_name}",
                    value.name()
                )));
            }
            values.push((value.name().to_string(), value.number()));
        }
        self.insert(
            qualified_name.clone(),
            Descriptor::Enum(EnumDescriptor {
                name: proto.name().to_string(),
                qualified_name: qualified_name.clone(),
                values,
                comment: comments.at(path),
            }),
        )?;
        Ok(qualified_name)
    }

    fn register_message(
        &mut self,
        scope: &str,
        proto: &DescriptorProto,
        comments: &CommentIndex,
        path: &[i32],
    ) -> Result<String, GenerateError> {
        let qualified_name = qualify(scope, proto.name());
        let mut nested = Vec::new();

        // Nested declarations first, so a message's own nested types are
        // resolvable before the message itself is looked up.
        for (idx, nested_proto) in proto.nested_type.iter().enumerate() {
            let nested_path = child_path(path, 3, idx);
            nested.push(self.register_message(
                &qualified_name,
                nested_proto,
                comments,
                &nested_path,
            )?);
        }
        for (idx, nested_enum) in proto.enum_type.iter().enumerate() {
            let nested_path = child_path(path, 4, idx);
            nested.push(self.register_enum(
                &qualified_name,
                nested_enum,
                comments,
                &nested_path,
            )?);
        }

        let mut fields = Vec::with_capacity(proto.field.len());
        for (idx, field) in proto.field.iter().enumerate() {
            let field_path = child_path(path, 2, idx);
            fields.push(FieldDescriptor::from_proto(field, comments.at(&field_path))?);
        }

        let map_entry = proto
            .options
            .as_ref()
            .is_some_and(|options| options.map_entry());

        self.insert(
            qualified_name.clone(),
            Descriptor::Message(MessageDescriptor {
                name: proto.name().to_string(),
                qualified_name: qualified_name.clone(),
                fields,
                nested,
                map_entry,
                comment: comments.at(path),
            }),
        )?;
        Ok(qualified_name)
    }

    fn register_service(
        &mut self,
        file: &FileDescriptorProto,
        scope: &str,
        proto: &ServiceDescriptorProto,
        rules: &FileHttpRules,
        comments: &CommentIndex,
        service_idx: usize,
    ) -> Result<String, GenerateError> {
        let qualified_name = qualify(scope, proto.name());
        let mut methods = Vec::with_capacity(proto.method.len());
        for (method_idx, method) in proto.method.iter().enumerate() {
            methods.push(self.build_method(
                method,
                rules.rule(service_idx, method_idx).cloned(),
                comments.at(&[6, service_idx as i32, 2, method_idx as i32]),
            )?);
        }
        self.insert(
            qualified_name.clone(),
            Descriptor::Service(ServiceDescriptor {
                name: proto.name().to_string(),
                qualified_name: qualified_name.clone(),
                proto_file: file.name().to_string(),
                package: scope.to_string(),
                methods,
                comment: comments.at(&[6, service_idx as i32]),
            }),
        )?;
        Ok(qualified_name)
    }

    fn build_method(
        &self,
        proto: &MethodDescriptorProto,
        http_rule: Option<HttpRule>,
        comment: String,
    ) -> Result<MethodDescriptor, GenerateError> {
        // Input and output must already be registered; the compiler presents
        // files in dependency order and this file's messages precede its
        // services.
        self.resolve_message(proto.input_type())?;
        self.resolve_message(proto.output_type())?;
        Ok(MethodDescriptor {
            name: proto.name().to_string(),
            input_type: proto.input_type().to_string(),
            output_type: proto.output_type().to_string(),
            method_type: MethodType::from_flags(
                proto.client_streaming(),
                proto.server_streaming(),
            ),
            http_rule,
            comment,
        })
    }

    fn insert(&mut self, name: String, descriptor: Descriptor) -> Result<(), GenerateError> {
        if self.entries.contains_key(&name) {
            return Err(GenerateError::Internal(format!(
                "descriptor {name} registered twice"
            )));
        }
        self.entries.insert(name, descriptor);
        Ok(())
    }

    /// Look up a descriptor by name. The compiler presents fully-qualified
    /// names prefixed with a "."; the prefix is stripped before lookup.
    /// A miss is an internal consistency error, never an input error.
    pub fn resolve(&self, name: &str) -> Result<&Descriptor, GenerateError> {
        let key = name.trim_start_matches('.');
        self.entries.get(key).ok_or_else(|| {
            GenerateError::Internal(format!("descriptor {name} is not present in the registry"))
        })
    }

    pub fn resolve_message(&self, name: &str) -> Result<&MessageDescriptor, GenerateError> {
        match self.resolve(name)? {
            Descriptor::Message(message) => Ok(message),
            _ => Err(GenerateError::Internal(format!(
                "descriptor {name} is not a message"
            ))),
        }
    }

    pub fn resolve_enum(&self, name: &str) -> Result<&EnumDescriptor, GenerateError> {
        match self.resolve(name)? {
            Descriptor::Enum(r#enum) => Ok(r#enum),
            _ => Err(GenerateError::Internal(format!(
                "descriptor {name} is not an enum"
            ))),
        }
    }

    pub fn resolve_service(&self, name: &str) -> Result<&ServiceDescriptor, GenerateError> {
        match self.resolve(name)? {
            Descriptor::Service(service) => Ok(service),
            _ => Err(GenerateError::Internal(format!(
                "descriptor {name} is not a service"
            ))),
        }
    }
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

fn child_path(parent: &[i32], field: i32, idx: usize) -> Vec<i32> {
    let mut path = parent.to_vec();
    path.push(field);
    path.push(idx as i32);
    path
}

/// Comments from the file's source-code info, indexed by location path.
struct CommentIndex {
    by_path: HashMap<Vec<i32>, String>,
}

impl CommentIndex {
    fn new(file: &FileDescriptorProto) -> Self {
        let mut by_path = HashMap::new();
        if let Some(info) = &file.source_code_info {
            for location in &info.location {
                let leading = location.leading_comments().trim();
                let trailing = location.trailing_comments().trim();
                let mut parts = Vec::new();
                if !leading.is_empty() {
                    parts.push(leading);
                }
                if !trailing.is_empty() {
                    parts.push(trailing);
                }
                if !parts.is_empty() {
                    by_path.insert(location.path.clone(), parts.join("\n"));
                }
            }
        }
        CommentIndex { by_path }
    }

    fn at(&self, path: &[i32]) -> String {
        self.by_path.get(path).cloned().unwrap_or_default()
    }
}
