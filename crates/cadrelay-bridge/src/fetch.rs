//! Automated single-call driver
//!
//! Fires one tool call built from configuration and feeds an actionable
//! response straight to the gate. Runs once per activation.

use cadrelay_client::{ClientConfig, ToolClient, TransportError};
use cadrelay_core::{EnvelopeError, RelayConfig, ResponseShape, ToolCallBody, ToolCallRequest, ToolCallResponse};
use cadrelay_script::{Confirm, DesignHandle, ExecutionGate, ExecutionOutcome, HostContext};
use tracing::info;

use crate::notice::Notifier;
use crate::outcome_from_transport;

/// Title of every notice the fetch driver shows
pub const NOTICE_TITLE: &str = "cadrelay fetch";

/// One-shot fetch-and-run driver
pub struct FetchDriver {
    config: RelayConfig,
    client: ToolClient,
    gate: ExecutionGate,
}

impl FetchDriver {
    /// Create a driver from fixed configuration
    pub fn new(config: &RelayConfig) -> Result<Self, TransportError> {
        let client = ToolClient::new(ClientConfig {
            timeout: config.timeout(),
        })?;

        Ok(Self {
            config: config.clone(),
            client,
            gate: ExecutionGate::from_config(config),
        })
    }

    /// The request this driver sends
    pub fn request(&self) -> Result<ToolCallRequest, EnvelopeError> {
        ToolCallRequest::new(self.config.tool_name.clone(), self.config.parameters.clone())
    }

    /// Fetch a script, pass it through the gate, and report the outcome
    ///
    /// Every result, including faults, is reported through `notifier` before
    /// it is returned.
    pub fn run(
        &self,
        confirm: &mut dyn Confirm,
        notifier: &mut dyn Notifier,
        design: &DesignHandle,
    ) -> ExecutionOutcome {
        let url = self.config.endpoint_url();
        notifier.notify(NOTICE_TITLE, &format!("Fetching script from {}...", url));

        let (outcome, note) = match self.fetch(&url) {
            Ok(response) => {
                let note = informational_note(&response);
                let outcome = self.gate.maybe_run(
                    response.script(),
                    confirm,
                    HostContext::Design(design.clone()),
                );
                (outcome, note)
            }
            Err(outcome) => (outcome, None),
        };

        info!(outcome = outcome.label(), "fetch finished");

        let message = match note {
            Some(note) if outcome == ExecutionOutcome::NoScript => format!("{}\n{}", outcome, note),
            _ => outcome.to_string(),
        };
        notifier.notify(NOTICE_TITLE, &message);

        outcome
    }

    fn fetch(&self, url: &str) -> Result<ToolCallResponse, ExecutionOutcome> {
        let request = self.request().map_err(|e| ExecutionOutcome::TransportError {
            detail: format!("Invalid request: {}", e),
        })?;
        let body = ToolCallBody::for_endpoint(self.config.endpoint, request);

        self.client
            .post(url, &body)
            .map(|reply| reply.response)
            .map_err(outcome_from_transport)
    }
}

/// Explain why a response has nothing to run
fn informational_note(response: &ToolCallResponse) -> Option<String> {
    if response.is_actionable() {
        return None;
    }
    if let Some(error) = response.embedded_error() {
        return Some(format!("Server reported: {}", error));
    }
    match response.shape() {
        ResponseShape::Object => None,
        ResponseShape::Sequence(0) => Some("Server returned an empty list".to_string()),
        ResponseShape::Sequence(_) => Some("First response element has no script".to_string()),
        ResponseShape::Other => Some("No valid response from server".to_string()),
    }
}
