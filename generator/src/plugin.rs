//! The protoc plugin boundary: request in, response out.

use prost::Message;
use prost_types::FileDescriptorProto;
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::CodeGeneratorResponse;

use crate::annotations::{FileHttpRules, RawCodeGeneratorRequest};
use crate::error::GenerateError;
use crate::method::bindings_for_service;
use crate::registry::Registry;
use crate::render::render_service;

/// The comma-separated `key` / `key=value` tokens of the plugin parameter
/// string.
#[derive(Debug, Default)]
pub struct Parameters {
    entries: Vec<(String, Option<String>)>,
}

impl Parameters {
    pub fn parse(parameter: Option<&str>) -> Result<Self, GenerateError> {
        let mut entries = Vec::new();
        for token in parameter
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            let parts: Vec<&str> = token.split('=').collect();
            if parts.len() > 2 || parts[0].is_empty() {
                return Err(GenerateError::Parameter(token.to_string()));
            }
            entries.push((parts[0].to_string(), parts.get(1).map(|v| v.to_string())));
        }
        Ok(Parameters { entries })
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    /// `style=rest` switches from RPC-shaped default bindings to REST
    /// binding generation.
    pub fn rest_style(&self) -> bool {
        self.value("style") == Some("rest")
    }
}

/// Run the whole pipeline over an encoded `CodeGeneratorRequest`.
///
/// Every file in the request is registered, in request order; output is
/// produced only for the files protoc asked to generate, one Java source
/// per service.
pub fn generate_response(input: &[u8]) -> Result<CodeGeneratorResponse, GenerateError> {
    let request = RawCodeGeneratorRequest::decode(input)?;
    let parameters = Parameters::parse(request.parameter.as_deref())?;
    let rest_style = parameters.rest_style();

    let mut registry = Registry::new();
    let mut files = Vec::new();
    for file_bytes in &request.proto_file {
        let descriptor = FileDescriptorProto::decode(file_bytes.as_slice())?;
        let rules = FileHttpRules::decode(file_bytes)?;
        let services = registry.register_file(&descriptor, &rules)?;
        tracing::info!(
            file = descriptor.name(),
            services = services.len(),
            "registered descriptors"
        );

        if !request.file_to_generate.iter().any(|f| f == descriptor.name()) {
            continue;
        }
        for service_name in &services {
            let service = registry.resolve_service(service_name)?;
            let bindings = bindings_for_service(&registry, service, rest_style)?;
            let (name, content) = render_service(service, &bindings);
            tracing::info!(
                service = %service.qualified_name,
                bindings = bindings.len(),
                output = %name,
                "generated service routes"
            );
            files.push(File {
                name: Some(name),
                content: Some(content),
                ..Default::default()
            });
        }
    }

    Ok(CodeGeneratorResponse {
        supported_features: Some(Feature::Proto3Optional as u64),
        file: files,
        ..Default::default()
    })
}

/// The error response protoc expects for a failed run: the message goes to
/// the `error` field instead of the process exit code.
pub fn error_response(err: &GenerateError) -> CodeGeneratorResponse {
    CodeGeneratorResponse {
        error: Some(err.to_string()),
        supported_features: Some(Feature::Proto3Optional as u64),
        ..Default::default()
    }
}
