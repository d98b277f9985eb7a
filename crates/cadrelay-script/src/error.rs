//! Script errors

use thiserror::Error;

/// Faults raised while loading or running a script
///
/// Every variant carries the full diagnostic text for the operator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The script did not parse
    #[error("Script compilation failed:\n{0}")]
    Compile(String),

    /// A top-level statement faulted
    #[error("Error while evaluating script:\n{0}")]
    Eval(String),

    /// The entry point faulted
    #[error("Error while executing {name}(context):\n{trace}")]
    Entry { name: String, trace: String },
}
