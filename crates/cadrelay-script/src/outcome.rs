//! Result of one tool-call attempt, as reported to the operator

use std::fmt;

/// How a tool call ended
///
/// Produced once per attempt and consumed by the driver that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The entry point returned normally
    ExecutedSuccess,
    /// Loading or running the script faulted
    ExecutedFailure { detail: String },
    /// The operator declined to run the script
    DeclinedByUser,
    /// The script evaluated but defines no `run(context)`
    NoEntryPoint,
    /// The response carried nothing to run
    NoScript,
    /// The server could not be reached
    TransportError { detail: String },
    /// The server rejected the call
    HttpError { status: u16, body: String },
    /// The server replied with something that is not JSON
    ParseError { detail: String },
}

impl ExecutionOutcome {
    /// Whether something went wrong (as opposed to an informational result)
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            ExecutionOutcome::ExecutedFailure { .. }
                | ExecutionOutcome::TransportError { .. }
                | ExecutionOutcome::HttpError { .. }
                | ExecutionOutcome::ParseError { .. }
        )
    }

    /// Whether the script ran to completion
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::ExecutedSuccess)
    }

    /// Short machine-friendly label
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionOutcome::ExecutedSuccess => "executed-success",
            ExecutionOutcome::ExecutedFailure { .. } => "executed-failure",
            ExecutionOutcome::DeclinedByUser => "declined-by-user",
            ExecutionOutcome::NoEntryPoint => "no-entry-point",
            ExecutionOutcome::NoScript => "no-script",
            ExecutionOutcome::TransportError { .. } => "transport-error",
            ExecutionOutcome::HttpError { .. } => "http-error",
            ExecutionOutcome::ParseError { .. } => "parse-error",
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::ExecutedSuccess => f.write_str("Script executed successfully"),
            ExecutionOutcome::ExecutedFailure { detail } => write!(f, "Script failed.\n{}", detail),
            ExecutionOutcome::DeclinedByUser => f.write_str("Script execution cancelled by user."),
            ExecutionOutcome::NoEntryPoint => write!(
                f,
                "No callable {}(context) found in script",
                crate::loader::ENTRY_POINT
            ),
            ExecutionOutcome::NoScript => f.write_str("No script field in response"),
            ExecutionOutcome::TransportError { detail } => {
                write!(f, "Failed to contact tool server:\n{}", detail)
            }
            ExecutionOutcome::HttpError { status, body } => {
                write!(f, "HTTP error {} from tool server:\n{}", status, body)
            }
            ExecutionOutcome::ParseError { detail } => {
                write!(f, "No valid response from server:\n{}", detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faults() {
        assert!(ExecutionOutcome::HttpError { status: 500, body: String::new() }.is_fault());
        assert!(!ExecutionOutcome::DeclinedByUser.is_fault());
        assert!(!ExecutionOutcome::NoScript.is_fault());
        assert!(!ExecutionOutcome::NoEntryPoint.is_fault());
    }

    #[test]
    fn test_notice_text() {
        assert_eq!(
            ExecutionOutcome::NoEntryPoint.to_string(),
            "No callable run(context) found in script"
        );
        assert_eq!(
            ExecutionOutcome::HttpError {
                status: 422,
                body: "{\"detail\":\"plane\"}".to_string()
            }
            .to_string(),
            "HTTP error 422 from tool server:\n{\"detail\":\"plane\"}"
        );
    }
}
