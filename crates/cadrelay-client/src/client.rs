//! Blocking tool-call client
//!
//! One POST per call, no retries: tool calls may have side effects on the
//! server, so a failed call is reported and left for the operator to repeat.

use cadrelay_core::{ToolCallBody, ToolCallRequest, ToolCallResponse};
use reqwest::Url;
use reqwest::blocking::Client;
use std::error::Error as _;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::TransportError;

/// Client settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Upper bound on the whole request
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(cadrelay_core::config::DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// A successful (2xx, valid JSON) reply
#[derive(Debug, Clone)]
pub struct RawReply {
    /// HTTP status code
    pub status: u16,
    /// Body exactly as received
    pub text: String,
    /// Parsed body
    pub response: ToolCallResponse,
}

/// HTTP client for `/call_tool` and `/call_tools`
#[derive(Debug, Clone)]
pub struct ToolClient {
    http: Client,
}

impl ToolClient {
    /// Create a client with the given timeout
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Transport(describe(&e)))?;

        Ok(Self { http })
    }

    /// POST one request to a `/call_tool` URL
    pub fn call(&self, url: &str, request: &ToolCallRequest) -> Result<ToolCallResponse, TransportError> {
        self.post(url, &ToolCallBody::Single(request.clone()))
            .map(|reply| reply.response)
    }

    /// POST a sequence of requests to a `/call_tools` URL
    pub fn call_batch(
        &self,
        url: &str,
        requests: &[ToolCallRequest],
    ) -> Result<ToolCallResponse, TransportError> {
        self.post(url, &ToolCallBody::Batch(requests.to_vec()))
            .map(|reply| reply.response)
    }

    /// POST a body and return both the raw text and the parsed response
    pub fn post(&self, url: &str, body: &ToolCallBody) -> Result<RawReply, TransportError> {
        let url = parse_url(url)?;
        body.validate()?;

        debug!(
            url = %url,
            tools = ?body.requests().iter().map(|r| r.tool_name.as_str()).collect::<Vec<_>>(),
            "posting tool call"
        );

        let response = self.http.post(url.clone()).json(body).send().map_err(|e| {
            let detail = describe(&e);
            warn!(url = %url, "tool call failed: {}", detail);
            TransportError::Transport(detail)
        })?;

        let status = response.status();
        if !status.is_success() {
            // Servers usually put structured detail in the body; fall back to the status line
            let status_line = format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or(""))
                .trim_end()
                .to_string();
            let body = match response.text() {
                Ok(text) if !text.trim().is_empty() => text,
                _ => status_line,
            };
            warn!(url = %url, status = status.as_u16(), "tool server rejected call");
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .map_err(|e| TransportError::Transport(describe(&e)))?;

        let value = serde_json::from_str(&text).map_err(|e| {
            warn!(url = %url, "tool server returned invalid JSON: {}", e);
            TransportError::Parse {
                detail: e.to_string(),
                body: text.clone(),
            }
        })?;

        debug!(url = %url, status = status.as_u16(), bytes = text.len(), "tool call succeeded");

        Ok(RawReply {
            status: status.as_u16(),
            text,
            response: ToolCallResponse::new(value),
        })
    }
}

/// Parse and check an absolute http(s) URL
pub fn parse_url(url: &str) -> Result<Url, TransportError> {
    let parsed = Url::parse(url.trim()).map_err(|e| TransportError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(TransportError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Render a reqwest error with its full cause chain
fn describe(err: &reqwest::Error) -> String {
    let mut detail = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    };

    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        detail.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }

    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_accepts_http() {
        assert!(parse_url("http://127.0.0.1:8000/call_tool").is_ok());
        assert!(parse_url("https://tools.example.com/call_tools").is_ok());
    }

    #[test]
    fn test_parse_url_rejects_relative_and_other_schemes() {
        assert!(matches!(parse_url("/call_tool"), Err(TransportError::InvalidUrl { .. })));
        assert!(matches!(
            parse_url("ftp://host/call_tool"),
            Err(TransportError::InvalidUrl { reason, .. }) if reason.contains("ftp")
        ));
    }

    #[test]
    fn test_invalid_request_is_rejected_before_io() {
        let client = ToolClient::new(ClientConfig::default()).unwrap();
        let request = ToolCallRequest {
            tool_name: String::new(),
            parameters: serde_json::Map::new(),
        };
        // Port 9 (discard) is never contacted: validation fails first
        let err = client.call("http://127.0.0.1:9/call_tool", &request).unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }
}
