//! cadrelay client - blocking HTTP/JSON transport for tool calls
//!
//! ```no_run
//! use cadrelay_client::{ClientConfig, ToolClient};
//! use cadrelay_core::ToolCallRequest;
//!
//! let client = ToolClient::new(ClientConfig::default())?;
//! let request = ToolCallRequest::from_json_params("CreateSketch", r#"{"plane": "xy"}"#)?;
//! let response = client.call("http://127.0.0.1:8000/call_tool", &request)?;
//! if let Some(script) = response.script() {
//!     println!("{script}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod client;
pub mod error;

pub use client::{ClientConfig, RawReply, ToolClient, parse_url};
pub use error::TransportError;
