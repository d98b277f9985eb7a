//! Transport error taxonomy

use cadrelay_core::EnvelopeError;
use thiserror::Error;

/// Why a tool call produced no usable response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The URL is not an absolute http(s) URL
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request envelope failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] EnvelopeError),

    /// Connection, DNS, or timeout failure
    #[error("Failed to contact tool server:\n{0}")]
    Transport(String),

    /// The server answered with a non-2xx status
    #[error("HTTP error {status} from tool server:\n{body}")]
    Http { status: u16, body: String },

    /// The server answered 2xx with a body that is not JSON
    #[error("Tool server returned invalid JSON: {detail}")]
    Parse { detail: String, body: String },
}
