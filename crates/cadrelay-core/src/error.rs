//! Error types for cadrelay

use thiserror::Error;

/// Result type alias using cadrelay's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Problems with a tool-call envelope before it is sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The tool name was empty or whitespace
    #[error("Tool name must not be empty")]
    EmptyToolName,

    /// The parameter document was not valid JSON
    #[error("Parameters are not valid JSON:\n{0}")]
    InvalidParameters(String),

    /// The parameter document parsed, but is not a JSON object
    #[error("Parameters must be a JSON object, got {0}")]
    ParametersNotObject(&'static str),

    /// A batch document element was not a `{tool_name, parameters}` object
    #[error("Batch element {index} is not a tool call: {detail}")]
    InvalidBatchElement { index: usize, detail: String },
}

/// Errors that can occur in cadrelay operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid request envelope
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
