//! A protoc plugin that generates Java WebFlux REST handlers for gRPC
//! services, driven by `google.api.http` annotations.
//!
//! The pipeline runs once per invocation: decode the compiler request,
//! register every file's descriptors, compute the HTTP bindings of each
//! service to generate, and render one handler class per service.

pub mod annotations;
pub mod error;
pub mod method;
pub mod plan;
pub mod plugin;
pub mod registry;
pub mod render;
pub mod visitor;

#[cfg(test)]
mod testutil;

pub use error::GenerateError;
pub use plugin::{Parameters, error_response, generate_response};
