//! cadrelay bridge - the automated and interactive drivers
//!
//! [`FetchDriver`] makes one configured call and hands the script to the gate.
//! [`Session`] is the state behind the interactive console.

pub mod fetch;
pub mod notice;
pub mod session;

pub use fetch::{FetchDriver, NOTICE_TITLE};
pub use notice::{Notice, NoticeLog, Notifier};
pub use session::{DEFAULT_SCRIPT_FILE, Session, SessionError, Transcript};

use cadrelay_client::TransportError;
use cadrelay_script::ExecutionOutcome;

/// Map a failed call to the outcome reported to the operator
pub fn outcome_from_transport(err: TransportError) -> ExecutionOutcome {
    match err {
        TransportError::Http { status, body } => ExecutionOutcome::HttpError { status, body },
        TransportError::Parse { detail, .. } => ExecutionOutcome::ParseError { detail },
        TransportError::Transport(detail) => ExecutionOutcome::TransportError { detail },
        other @ (TransportError::InvalidUrl { .. } | TransportError::InvalidRequest(_)) => {
            ExecutionOutcome::TransportError {
                detail: other.to_string(),
            }
        }
    }
}
