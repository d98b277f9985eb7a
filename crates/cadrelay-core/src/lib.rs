//! cadrelay core - tool-call envelope and relay configuration
//!
//! Shared by the transport client, the script gate, and both front ends.
//!
//! ## Example
//!
//! ```
//! use cadrelay_core::{ToolCallRequest, ToolCallResponse};
//! use serde_json::json;
//!
//! let request = ToolCallRequest::from_json_params("CreateSketch", r#"{"plane": "xy"}"#).unwrap();
//! assert_eq!(request.tool_name, "CreateSketch");
//!
//! let response = ToolCallResponse::new(json!({"script": "fn run(ctx) {}"}));
//! assert!(response.is_actionable());
//! ```

pub mod config;
pub mod envelope;
pub mod error;

pub use config::{RelayConfig, config_path, endpoint_url, load_config};
pub use envelope::{Endpoint, ResponseShape, ToolCallBody, ToolCallRequest, ToolCallResponse, parse_parameters};
pub use error::{EnvelopeError, Error, Result};
