//! cadrelay script - loading and gated execution of received scripts
//!
//! Scripts are Rhai source text. A runnable script defines an entry point
//! named `run` that takes one context argument:
//!
//! ```rhai
//! // Hollow cylinder on the XY plane
//! fn run(ctx) {
//!     let sketch = ctx.add_sketch("xy");
//!     ctx.add_circle(sketch, 0.0, 0.0, 12.0);
//!     let body = ctx.extrude(sketch, 20.0);
//!     ctx.shell(body, 2.0);
//! }
//! ```
//!
//! The [`ExecutionGate`] decides whether a script runs at all: it shows the
//! operator a truncated preview and waits for an answer, unless the policy
//! auto-executes.
//!
//! ## Precision Notes
//!
//! Host functions take `f64` dimensions and `i64` sketch/body indices. Rhai
//! does not convert integer literals to floats, so write `12.0`, not `12`.

pub mod error;
pub mod gate;
pub mod host;
pub mod loader;
pub mod outcome;
pub mod preview;

pub use error::ScriptError;
pub use gate::{AlwaysConfirm, Confirm, ExecutionGate, ExecutionPolicy, NeverConfirm};
pub use host::{Design, DesignHandle, HostError, register_host_api};
pub use loader::{ENTRY_POINT, EntryPoint, HostContext, LoadedScript, RhaiLimits, RhaiLoader, ScriptLoader};
pub use outcome::ExecutionOutcome;
pub use preview::{ScriptPreview, TRUNCATION_MARKER};
