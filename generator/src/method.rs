//! Turning rpc methods into HTTP route bindings.
//!
//! One method yields one binding per usable HTTP rule pattern (the primary
//! pattern plus each additional binding), or a single RPC-shaped default
//! binding when REST generation is off, the method carries no rule, or every
//! pattern degraded.

use heck::{ToLowerCamelCase, ToShoutySnakeCase};

use crate::annotations::{HttpRule, http_rule::Pattern};
use crate::error::GenerateError;
use crate::plan::{TranscodeStep, TranscodingPlan, build_plan};
use crate::registry::{MethodDescriptor, MethodType, Registry, ServiceDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    Get,
    Put,
    Post,
    Delete,
    Patch,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Put => "PUT",
            HttpVerb::Post => "POST",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Patch => "PATCH",
        }
    }
}

/// Everything the renderer needs for one HTTP route.
#[derive(Debug)]
pub struct Binding {
    pub service_name: String,
    pub method_name: String,
    /// Handler name: lower-camel method name, suffixed with the zero-based
    /// additional-binding index for non-primary bindings.
    pub route_name: String,
    pub verb: HttpVerb,
    pub route_path: String,
    pub input_type: String,
    pub output_type: String,
    pub method_type: MethodType,
    pub comment: String,
    pub plan: TranscodingPlan,
}

impl Binding {
    /// Name of the generated route-path constant.
    pub fn path_const(&self) -> String {
        format!("{}_PATH", self.route_name.to_shouty_snake_case())
    }
}

/// Compute the bindings of every method of a service, method order first,
/// binding order second.
pub fn bindings_for_service(
    registry: &Registry,
    service: &ServiceDescriptor,
    rest_style: bool,
) -> Result<Vec<Binding>, GenerateError> {
    let mut bindings = Vec::new();
    for method in &service.methods {
        bindings.extend(bindings_for_method(registry, service, method, rest_style)?);
    }
    Ok(bindings)
}

fn bindings_for_method(
    registry: &Registry,
    service: &ServiceDescriptor,
    method: &MethodDescriptor,
    rest_style: bool,
) -> Result<Vec<Binding>, GenerateError> {
    let mut bindings = Vec::new();
    if rest_style {
        if let Some(rule) = &method.http_rule {
            // Additional bindings are flattened one level; bindings nested
            // below them are ignored.
            for (idx, rule) in std::iter::once(rule)
                .chain(rule.additional_bindings.iter())
                .enumerate()
            {
                let suffix = idx.checked_sub(1).map(|i| i.to_string());
                if let Some(binding) =
                    rule_binding(registry, service, method, rule, suffix)?
                {
                    bindings.push(binding);
                }
            }
        }
    }
    if bindings.is_empty() {
        bindings.push(default_binding(service, method));
    }
    Ok(bindings)
}

/// One binding from one rule pattern, or `None` when the pattern uses an
/// unsupported feature and the binding is skipped.
fn rule_binding(
    registry: &Registry,
    service: &ServiceDescriptor,
    method: &MethodDescriptor,
    rule: &HttpRule,
    suffix: Option<String>,
) -> Result<Option<Binding>, GenerateError> {
    let (verb, pattern) = match &rule.pattern {
        Some(Pattern::Get(p)) => (HttpVerb::Get, p),
        Some(Pattern::Put(p)) => (HttpVerb::Put, p),
        Some(Pattern::Post(p)) => (HttpVerb::Post, p),
        Some(Pattern::Delete(p)) => (HttpVerb::Delete, p),
        Some(Pattern::Patch(p)) => (HttpVerb::Patch, p),
        Some(Pattern::Custom(custom)) => {
            tracing::error!(
                service = %service.qualified_name,
                method = %method.name,
                kind = %custom.kind,
                "custom HTTP patterns are not supported, skipping binding"
            );
            return Ok(None);
        }
        None => {
            tracing::warn!(
                service = %service.qualified_name,
                method = %method.name,
                "HTTP rule carries no pattern, skipping binding"
            );
            return Ok(None);
        }
    };

    let template = match path_template::parse(pattern) {
        Ok(template) => template,
        Err(err) if err.is_unsupported() => {
            tracing::warn!(
                service = %service.qualified_name,
                method = %method.name,
                template = %pattern,
                %err,
                "skipping binding"
            );
            return Ok(None);
        }
        Err(err) => {
            return Err(GenerateError::config(
                &service.proto_file,
                format!("method {}.{}: {err}", service.qualified_name, method.name),
            ));
        }
    };

    let plan = build_plan(
        registry,
        &method.input_type,
        &template,
        &rule.body,
        &service.proto_file,
    )?;
    let mut route_name = method.name.to_lower_camel_case();
    if let Some(suffix) = suffix {
        route_name.push_str(&suffix);
    }
    Ok(Some(Binding {
        service_name: service.name.clone(),
        method_name: method.name.clone(),
        route_name,
        verb,
        route_path: template.route_path(),
        input_type: method.input_type.clone(),
        output_type: method.output_type.clone(),
        method_type: method.method_type,
        comment: method.comment.clone(),
        plan,
    }))
}

/// The RPC-shaped fallback: POST to `/{ServiceName}/{methodName}` with the
/// whole request message as the body.
fn default_binding(service: &ServiceDescriptor, method: &MethodDescriptor) -> Binding {
    let route_name = method.name.to_lower_camel_case();
    Binding {
        service_name: service.name.clone(),
        method_name: method.name.clone(),
        route_path: format!("/{}/{route_name}", service.name),
        route_name,
        verb: HttpVerb::Post,
        input_type: method.input_type.clone(),
        output_type: method.output_type.clone(),
        method_type: method.method_type,
        comment: method.comment.clone(),
        plan: TranscodingPlan {
            steps: vec![TranscodeStep::MergeWholeBody],
        },
    }
}
