use thiserror::Error;

/// Failure modes of the generation pipeline.
///
/// Unsupported-feature conditions (custom HTTP patterns, wildcard segments)
/// never surface here; they are logged and the affected binding is skipped.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The request payload could not be decoded. Reported before any
    /// registry work begins.
    #[error("failed to decode code generator request: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A malformed `key=value` token in the plugin parameter string.
    #[error("invalid build parameter: {0}")]
    Parameter(String),

    /// An inconsistent HTTP binding. Fatal for the file being processed:
    /// generated code for it would not compile.
    #[error("invalid HTTP binding in {file}: {message}")]
    Config { file: String, message: String },

    /// A violated internal invariant, e.g. a registry lookup miss. The
    /// compiler guarantees dependency-ordered, fully-linked input, so this
    /// indicates a bug rather than bad input.
    #[error("internal consistency error: {0}")]
    Internal(String),
}

impl GenerateError {
    pub fn config(file: impl Into<String>, message: impl Into<String>) -> Self {
        GenerateError::Config {
            file: file.into(),
            message: message.into(),
        }
    }
}
