//! The `google.api.http` method-option extension.
//!
//! `prost-types` does not model extensions, so the rule is recovered by
//! re-decoding the raw `FileDescriptorProto` bytes through a partial mirror
//! in which the extension appears as a plain optional field (extensions are
//! wire-compatible with ordinary fields of the same number).

use prost::Message;

/// Mirror of `google.api.HttpRule`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HttpRule {
    #[prost(string, tag = "1")]
    pub selector: String,
    /// The request-body field selector: `""` = no body, `"*"` = whole
    /// message, otherwise the name of a top-level request field.
    #[prost(string, tag = "7")]
    pub body: String,
    /// Sibling bindings. Never nested: the additional bindings of an
    /// additional binding are ignored by construction.
    #[prost(message, repeated, tag = "11")]
    pub additional_bindings: Vec<HttpRule>,
    #[prost(oneof = "http_rule::Pattern", tags = "2, 3, 4, 5, 6, 8")]
    pub pattern: Option<http_rule::Pattern>,
}

pub mod http_rule {
    /// The verb + path pattern of a rule.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Pattern {
        #[prost(string, tag = "2")]
        Get(String),
        #[prost(string, tag = "3")]
        Put(String),
        #[prost(string, tag = "4")]
        Post(String),
        #[prost(string, tag = "5")]
        Delete(String),
        #[prost(string, tag = "6")]
        Patch(String),
        #[prost(message, tag = "8")]
        Custom(super::CustomHttpPattern),
    }
}

/// Mirror of `google.api.CustomHttpPattern`. Recognized but not supported.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CustomHttpPattern {
    #[prost(string, tag = "1")]
    pub kind: String,
    #[prost(string, tag = "2")]
    pub path: String,
}

/// Mirror of `CodeGeneratorRequest` keeping the file descriptors as raw
/// bytes, so each file can be decoded both as a
/// `prost_types::FileDescriptorProto` and through the annotation mirror.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawCodeGeneratorRequest {
    #[prost(string, repeated, tag = "1")]
    pub file_to_generate: Vec<String>,
    #[prost(string, optional, tag = "2")]
    pub parameter: Option<String>,
    #[prost(bytes = "vec", repeated, tag = "15")]
    pub proto_file: Vec<Vec<u8>>,
}

/// Partial mirror of `FileDescriptorProto`: only the path down to the method
/// options, where the `(google.api.http)` extension lives at field 72295728.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawFileDescriptor {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(message, repeated, tag = "6")]
    pub service: Vec<RawService>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawService {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(message, repeated, tag = "2")]
    pub method: Vec<RawMethod>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawMethod {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub input_type: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub output_type: Option<String>,
    #[prost(message, optional, tag = "4")]
    pub options: Option<RawMethodOptions>,
    #[prost(bool, optional, tag = "5")]
    pub client_streaming: Option<bool>,
    #[prost(bool, optional, tag = "6")]
    pub server_streaming: Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawMethodOptions {
    #[prost(message, optional, tag = "72295728")]
    pub http: Option<HttpRule>,
}

/// The HTTP rules of one file, indexed by (service index, method index).
#[derive(Debug, Default)]
pub struct FileHttpRules {
    services: Vec<Vec<Option<HttpRule>>>,
}

impl FileHttpRules {
    /// Decode the rules out of raw `FileDescriptorProto` bytes.
    pub fn decode(file_bytes: &[u8]) -> Result<Self, prost::DecodeError> {
        let raw = RawFileDescriptor::decode(file_bytes)?;
        Ok(FileHttpRules {
            services: raw
                .service
                .into_iter()
                .map(|svc| {
                    svc.method
                        .into_iter()
                        .map(|m| m.options.and_then(|o| o.http))
                        .collect()
                })
                .collect(),
        })
    }

    pub fn rule(&self, service_idx: usize, method_idx: usize) -> Option<&HttpRule> {
        self.services
            .get(service_idx)
            .and_then(|methods| methods.get(method_idx))
            .and_then(|rule| rule.as_ref())
    }
}
