//! Tool-call envelope: the JSON request and response exchanged with a tool server
//!
//! A request names a tool and carries a parameter object:
//!
//! ```json
//! {"tool_name": "CreateSketch", "parameters": {"plane": "xy"}}
//! ```
//!
//! A response is arbitrary JSON. It becomes *actionable* when it carries a
//! non-empty `script` string, either at the top level of an object or in the
//! first element of an array (batch replies).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::EnvelopeError;

/// Key of the script payload in a response object
pub const SCRIPT_KEY: &str = "script";

/// Keys a server may use to report a per-element failure in a batch reply
const EMBEDDED_ERROR_KEYS: [&str; 2] = ["error", "detail"];

/// Server endpoint selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Endpoint {
    /// `POST /call_tool` with a single request object
    #[default]
    #[serde(rename = "/call_tool")]
    CallTool,
    /// `POST /call_tools` with an array of request objects
    #[serde(rename = "/call_tools")]
    CallTools,
}

impl Endpoint {
    /// URL path of the endpoint
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::CallTool => "/call_tool",
            Endpoint::CallTools => "/call_tools",
        }
    }

    /// Whether the endpoint takes a sequence of requests
    pub fn is_batch(self) -> bool {
        matches!(self, Endpoint::CallTools)
    }

    /// Parse an operator-typed endpoint name
    ///
    /// Accepts the path itself (`/call_tools`), the bare name (`call_tools`),
    /// or the shorthands `single` and `batch`.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().trim_start_matches('/').to_ascii_lowercase().as_str() {
            "call_tool" | "single" => Some(Endpoint::CallTool),
            "call_tools" | "batch" => Some(Endpoint::CallTools),
            _ => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A single named tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Name of the remote tool
    pub tool_name: String,
    /// Tool parameters, keyed by name
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl ToolCallRequest {
    /// Create a request, rejecting a blank tool name
    ///
    /// The name is sent exactly as given.
    pub fn new(tool_name: impl Into<String>, parameters: Map<String, Value>) -> Result<Self, EnvelopeError> {
        let request = Self {
            tool_name: tool_name.into(),
            parameters,
        };
        request.validate()?;
        Ok(request)
    }

    /// Create a request from a free-form JSON parameter document
    ///
    /// Blank text means no parameters.
    pub fn from_json_params(tool_name: impl Into<String>, params: &str) -> Result<Self, EnvelopeError> {
        Self::new(tool_name, parse_parameters(params)?)
    }

    /// Check the invariants a server relies on
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.tool_name.trim().is_empty() {
            return Err(EnvelopeError::EmptyToolName);
        }
        Ok(())
    }
}

/// Parse a parameter document, which must be blank or a JSON object
pub fn parse_parameters(text: &str) -> Result<Map<String, Value>, EnvelopeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Map::new());
    }

    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| EnvelopeError::InvalidParameters(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(EnvelopeError::ParametersNotObject(json_kind(&other))),
    }
}

/// Body of a POST to either endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolCallBody {
    /// Body for `/call_tool`
    Single(ToolCallRequest),
    /// Body for `/call_tools`
    Batch(Vec<ToolCallRequest>),
}

impl ToolCallBody {
    /// Wrap a request for the given endpoint
    ///
    /// The batch endpoint gets a one-element sequence.
    pub fn for_endpoint(endpoint: Endpoint, request: ToolCallRequest) -> Self {
        if endpoint.is_batch() {
            ToolCallBody::Batch(vec![request])
        } else {
            ToolCallBody::Single(request)
        }
    }

    /// Build a batch body from an operator document
    ///
    /// An array is read as a list of `{tool_name, parameters}` objects. An
    /// object (or blank text) is used as the parameters of one request for
    /// `tool_name`.
    pub fn batch_from_document(tool_name: &str, document: &str) -> Result<Self, EnvelopeError> {
        let trimmed = document.trim();
        if !trimmed.starts_with('[') {
            let request = ToolCallRequest::from_json_params(tool_name, trimmed)?;
            return Ok(ToolCallBody::Batch(vec![request]));
        }

        let value: Value =
            serde_json::from_str(trimmed).map_err(|e| EnvelopeError::InvalidParameters(e.to_string()))?;
        let items = match value {
            Value::Array(items) => items,
            other => return Err(EnvelopeError::ParametersNotObject(json_kind(&other))),
        };

        let requests = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let request: ToolCallRequest = serde_json::from_value(item).map_err(|e| {
                    EnvelopeError::InvalidBatchElement {
                        index,
                        detail: e.to_string(),
                    }
                })?;
                request.validate().map_err(|e| EnvelopeError::InvalidBatchElement {
                    index,
                    detail: e.to_string(),
                })?;
                Ok(request)
            })
            .collect::<Result<Vec<_>, EnvelopeError>>()?;

        Ok(ToolCallBody::Batch(requests))
    }

    /// Requests carried by this body
    pub fn requests(&self) -> &[ToolCallRequest] {
        match self {
            ToolCallBody::Single(request) => std::slice::from_ref(request),
            ToolCallBody::Batch(requests) => requests,
        }
    }

    /// Validate every request in the body
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        self.requests().iter().try_for_each(ToolCallRequest::validate)
    }
}

/// Coarse shape of a response, used for operator notices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// A JSON object
    Object,
    /// A JSON array of the given length
    Sequence(usize),
    /// Anything else (string, number, null...)
    Other,
}

/// Parsed server response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolCallResponse {
    value: Value,
}

impl ToolCallResponse {
    /// Wrap a parsed JSON value
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// The raw JSON value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Shape of the top-level value
    pub fn shape(&self) -> ResponseShape {
        match &self.value {
            Value::Object(_) => ResponseShape::Object,
            Value::Array(items) => ResponseShape::Sequence(items.len()),
            _ => ResponseShape::Other,
        }
    }

    /// The object the script is looked up in: the response itself, or the
    /// first element of a sequence
    fn primary(&self) -> Option<&Map<String, Value>> {
        match &self.value {
            Value::Object(map) => Some(map),
            Value::Array(items) => items.first().and_then(Value::as_object),
            _ => None,
        }
    }

    /// The embedded script, if the response is actionable
    ///
    /// Only element 0 of a sequence is consulted.
    pub fn script(&self) -> Option<&str> {
        self.primary()
            .and_then(|map| map.get(SCRIPT_KEY))
            .and_then(Value::as_str)
            .filter(|script| !script.is_empty())
    }

    /// Whether the response carries a runnable script
    pub fn is_actionable(&self) -> bool {
        self.script().is_some()
    }

    /// Error text the server embedded in the primary object instead of a script
    pub fn embedded_error(&self) -> Option<String> {
        let map = self.primary()?;
        if self.is_actionable() {
            return None;
        }
        EMBEDDED_ERROR_KEYS.iter().find_map(|key| match map.get(*key)? {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
    }
}

impl From<Value> for ToolCallResponse {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_to_wire_shape() {
        let request = ToolCallRequest::from_json_params("CreateSketch", r#"{"plane": "xy"}"#).unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"tool_name": "CreateSketch", "parameters": {"plane": "xy"}}));
    }

    #[test]
    fn test_missing_parameters_default_to_empty() {
        let request: ToolCallRequest = serde_json::from_str(r#"{"tool_name": "Ping"}"#).unwrap();
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn test_empty_tool_name_rejected() {
        assert_eq!(
            ToolCallRequest::new("   ", Map::new()),
            Err(EnvelopeError::EmptyToolName)
        );
    }

    #[test]
    fn test_tool_name_sent_as_given() {
        let request = ToolCallRequest::new(" Tool ", Map::new()).unwrap();
        assert_eq!(request.tool_name, " Tool ");
        assert_eq!(serde_json::to_value(&request).unwrap()["tool_name"], " Tool ");
    }

    #[test]
    fn test_invalid_parameter_documents() {
        assert!(matches!(
            parse_parameters("{plane: xy}"),
            Err(EnvelopeError::InvalidParameters(_))
        ));
        assert_eq!(
            parse_parameters("[1, 2]"),
            Err(EnvelopeError::ParametersNotObject("an array"))
        );
        assert!(parse_parameters("  ").unwrap().is_empty());
    }

    #[test]
    fn test_body_for_endpoint() {
        let request = ToolCallRequest::new("Ping", Map::new()).unwrap();
        let single = ToolCallBody::for_endpoint(Endpoint::CallTool, request.clone());
        let batch = ToolCallBody::for_endpoint(Endpoint::CallTools, request);

        assert!(serde_json::to_value(&single).unwrap().is_object());
        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!([{"tool_name": "Ping", "parameters": {}}])
        );
    }

    #[test]
    fn test_batch_document_list() {
        let body = ToolCallBody::batch_from_document(
            "Ignored",
            r#"[{"tool_name": "A"}, {"tool_name": "B", "parameters": {"n": 2}}]"#,
        )
        .unwrap();
        let names: Vec<_> = body.requests().iter().map(|r| r.tool_name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn test_batch_document_bad_element() {
        let err = ToolCallBody::batch_from_document("X", r#"[{"tool_name": "A"}, {"nope": 1}]"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidBatchElement { index: 1, .. }));
    }

    #[test]
    fn test_batch_document_object_is_wrapped() {
        let body = ToolCallBody::batch_from_document("CreateSketch", r#"{"plane": "yz"}"#).unwrap();
        assert_eq!(body.requests().len(), 1);
        assert_eq!(body.requests()[0].parameters["plane"], "yz");
    }

    #[test]
    fn test_script_in_object() {
        let response = ToolCallResponse::new(json!({"script": "fn run(ctx) {}"}));
        assert_eq!(response.script(), Some("fn run(ctx) {}"));
        assert_eq!(response.shape(), ResponseShape::Object);
    }

    #[test]
    fn test_empty_or_missing_script_is_informational() {
        assert!(!ToolCallResponse::new(json!({"script": ""})).is_actionable());
        assert!(!ToolCallResponse::new(json!({"status": "ok"})).is_actionable());
        assert!(!ToolCallResponse::new(json!({"script": 42})).is_actionable());
        assert!(!ToolCallResponse::new(json!("script")).is_actionable());
    }

    #[test]
    fn test_sequence_uses_first_element_only() {
        let response = ToolCallResponse::new(json!([{"status": "ok"}, {"script": "second"}]));
        assert_eq!(response.script(), None);

        let response = ToolCallResponse::new(json!([{"script": "first"}, {"script": "second"}]));
        assert_eq!(response.script(), Some("first"));
        assert_eq!(response.shape(), ResponseShape::Sequence(2));
    }

    #[test]
    fn test_empty_sequence_is_not_actionable() {
        let response = ToolCallResponse::new(json!([]));
        assert!(!response.is_actionable());
        assert_eq!(response.embedded_error(), None);
    }

    #[test]
    fn test_embedded_error() {
        let response = ToolCallResponse::new(json!([{"error": "unknown tool"}]));
        assert_eq!(response.embedded_error().as_deref(), Some("unknown tool"));

        let response = ToolCallResponse::new(json!({"detail": {"missing": "plane"}}));
        assert_eq!(response.embedded_error().as_deref(), Some(r#"{"missing":"plane"}"#));
    }

    #[test]
    fn test_endpoint_parse() {
        assert_eq!(Endpoint::parse("/call_tools"), Some(Endpoint::CallTools));
        assert_eq!(Endpoint::parse("single"), Some(Endpoint::CallTool));
        assert_eq!(Endpoint::parse("/other"), None);
        assert_eq!(Endpoint::CallTools.to_string(), "/call_tools");
    }
}
