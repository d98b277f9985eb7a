//! Interactive tool-call session
//!
//! An operator edits the server, endpoint, tool name and parameter text, sends
//! calls, and inspects an append-only transcript. The last parsed response is
//! remembered so its script can be saved or run.

use cadrelay_client::{ToolClient, TransportError};
use cadrelay_core::{Endpoint, EnvelopeError, RelayConfig, ToolCallBody, ToolCallRequest, ToolCallResponse, endpoint_url};
use cadrelay_script::{Confirm, ExecutionGate, ExecutionOutcome, HostContext};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default file name for `save_last_script`
pub const DEFAULT_SCRIPT_FILE: &str = "generated_script.rhai";

/// Errors from session operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid parameters: {0}")]
    Params(#[from] EnvelopeError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("No response yet; send a tool call first")]
    NoResponse,

    #[error("Last response has no script")]
    NoScript,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only record of everything sent and received
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<String>,
    mirror: Option<File>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also append every entry to `path`
    pub fn with_mirror(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            entries: Vec::new(),
            mirror: Some(file),
        })
    }

    /// Add an entry; earlier entries are never touched
    pub fn append(&mut self, entry: impl Into<String>) {
        let entry = entry.into();

        if let Some(file) = self.mirror.as_mut() {
            if let Err(e) = file.write_all(entry.as_bytes()).and_then(|()| file.flush()) {
                warn!("failed to mirror transcript entry: {}", e);
            }
        }

        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// All entries joined in order
    pub fn text(&self) -> String {
        self.entries.concat()
    }
}

/// Editable state of an interactive session
#[derive(Debug)]
pub struct Session {
    pub server_url: String,
    pub endpoint: Endpoint,
    pub tool_name: String,
    params_text: String,
    transcript: Transcript,
    last_response: Option<ToolCallResponse>,
}

impl Session {
    /// Start a session from configuration defaults
    pub fn new(config: &RelayConfig) -> Self {
        let params_text = serde_json::to_string_pretty(&config.parameters).unwrap_or_default();

        Self {
            server_url: config.server_url.clone(),
            endpoint: config.endpoint,
            tool_name: config.tool_name.clone(),
            params_text,
            transcript: Transcript::new(),
            last_response: None,
        }
    }

    /// Replace the transcript, e.g. with a file-mirrored one
    #[must_use]
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn params_text(&self) -> &str {
        &self.params_text
    }

    /// Replace the parameter document; it is validated on send
    pub fn set_params_text(&mut self, text: impl Into<String>) {
        self.params_text = text.into();
    }

    pub fn clear_params(&mut self) {
        self.params_text.clear();
    }

    /// Full URL the next call goes to
    pub fn url(&self) -> String {
        endpoint_url(&self.server_url, self.endpoint)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn last_response(&self) -> Option<&ToolCallResponse> {
        self.last_response.as_ref()
    }

    /// Body for the current endpoint, tool name and parameter text
    ///
    /// In batch mode an array document lists the requests explicitly; an
    /// object document becomes a one-element sequence.
    pub fn build_body(&self) -> Result<ToolCallBody, EnvelopeError> {
        if self.endpoint.is_batch() {
            ToolCallBody::batch_from_document(&self.tool_name, &self.params_text)
        } else {
            ToolCallRequest::from_json_params(self.tool_name.as_str(), &self.params_text).map(ToolCallBody::Single)
        }
    }

    /// Send one tool call and record it in the transcript
    ///
    /// Invalid parameters are rejected before any network activity and leave
    /// the transcript and last response untouched.
    pub fn send(&mut self, client: &ToolClient) -> Result<&ToolCallResponse, SessionError> {
        let body = self.build_body()?;
        let url = self.url();

        let pretty = serde_json::to_string_pretty(&body).unwrap_or_default();
        self.transcript.append(format!("POST {} with body:\n{}\n", url, pretty));

        match client.post(&url, &body) {
            Ok(reply) => {
                debug!(status = reply.status, actionable = reply.response.is_actionable(), "response recorded");
                self.transcript.append(format!("Response:\n{}\n", reply.text));
                Ok(&*self.last_response.insert(reply.response))
            }
            Err(e) => {
                self.last_response = None;
                match &e {
                    TransportError::Parse { body, .. } => {
                        self.transcript.append(format!("Error:\n{}\nRaw response:\n{}\n", e, body));
                    }
                    _ => self.transcript.append(format!("Error:\n{}\n", e)),
                }
                Err(e.into())
            }
        }
    }

    /// Script of the last response, if it had one
    pub fn last_script(&self) -> Option<&str> {
        self.last_response.as_ref().and_then(ToolCallResponse::script)
    }

    fn require_script(&self) -> Result<&str, SessionError> {
        let response = self.last_response.as_ref().ok_or(SessionError::NoResponse)?;
        response.script().ok_or(SessionError::NoScript)
    }

    /// Write the last script verbatim to `path`
    ///
    /// Saving does not depend on whether the script was run.
    pub fn save_last_script(&mut self, path: Option<&Path>) -> Result<PathBuf, SessionError> {
        let script = self.require_script()?;
        let path = path.map_or_else(|| PathBuf::from(DEFAULT_SCRIPT_FILE), Path::to_path_buf);

        std::fs::write(&path, script)?;

        info!(path = %path.display(), bytes = script.len(), "script saved");
        self.transcript.append(format!("Saved script to {}\n", path.display()));
        Ok(path)
    }

    /// Pass the last script through the gate with no host attached
    pub fn run_last_script(
        &mut self,
        gate: &ExecutionGate,
        confirm: &mut dyn Confirm,
    ) -> Result<ExecutionOutcome, SessionError> {
        let script = self.require_script()?;
        let outcome = gate.maybe_run(Some(script), confirm, HostContext::Detached);

        self.transcript.append(format!("Run: {}\n", outcome));
        Ok(outcome)
    }
}
