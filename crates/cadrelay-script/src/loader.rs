//! Script loading strategies and entry points
//!
//! A [`ScriptLoader`] turns source text into a [`LoadedScript`]: the script's
//! top-level statements have run, and its entry point (if it defines one) is
//! ready to be invoked with a [`HostContext`].

use crate::error::ScriptError;
use crate::host::{DesignHandle, register_host_api};
use rhai::{AST, CallFnOptions, Dynamic, Engine, EvalAltResult, Scope};
use tracing::{debug, info};

/// Name of the function a script must define to be runnable
pub const ENTRY_POINT: &str = "run";

/// Tracing target for script `print` and `debug` output
pub const SCRIPT_LOG_TARGET: &str = "cadrelay::script";

/// The single argument passed to a script's entry point
#[derive(Debug, Clone, Default)]
pub enum HostContext {
    /// A design the script can build into
    Design(DesignHandle),
    /// No host attached; the script receives `()`
    #[default]
    Detached,
}

impl HostContext {
    fn into_dynamic(self) -> Dynamic {
        match self {
            HostContext::Design(handle) => Dynamic::from(handle),
            HostContext::Detached => Dynamic::UNIT,
        }
    }
}

/// An action a loaded script exposes
pub trait EntryPoint {
    /// Name the entry point was found under
    fn name(&self) -> &str;

    /// Invoke the entry point and wait for it to finish
    fn execute(&mut self, ctx: HostContext) -> Result<(), ScriptError>;
}

/// A script whose top-level statements have been evaluated
pub struct LoadedScript {
    /// The script's entry point, if it defines one
    pub entry: Option<Box<dyn EntryPoint>>,
}

/// Strategy for turning script text into something runnable
pub trait ScriptLoader {
    /// Evaluate `source` in a fresh, isolated scope
    fn load(&self, source: &str) -> Result<LoadedScript, ScriptError>;
}

/// Limits applied to every Rhai engine the loader creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RhaiLimits {
    /// Operation budget per load and per entry-point call (0 = unlimited)
    pub max_operations: u64,
    /// Maximum expression nesting depth
    pub max_expr_depth: usize,
    /// Maximum nesting depth inside functions
    pub max_function_expr_depth: usize,
}

impl Default for RhaiLimits {
    fn default() -> Self {
        Self {
            max_operations: cadrelay_core::config::DEFAULT_MAX_OPERATIONS,
            max_expr_depth: 64,
            max_function_expr_depth: 64,
        }
    }
}

/// Loads Rhai scripts with the design host API registered
#[derive(Debug, Clone, Default)]
pub struct RhaiLoader {
    limits: RhaiLimits,
}

impl RhaiLoader {
    /// Create a loader with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader with the given limits
    pub fn with_limits(limits: RhaiLimits) -> Self {
        Self { limits }
    }

    /// Build a fresh engine; nothing is shared between loads
    fn engine(&self) -> Engine {
        let mut engine = Engine::new();

        register_host_api(&mut engine);

        engine.set_max_expr_depths(self.limits.max_expr_depth, self.limits.max_function_expr_depth);
        engine.set_max_operations(self.limits.max_operations);

        engine.on_print(|text| info!(target: SCRIPT_LOG_TARGET, "{}", text));
        engine.on_debug(|text, source, pos| {
            debug!(target: SCRIPT_LOG_TARGET, source = source.unwrap_or(""), "{} {}", pos, text);
        });

        engine
    }
}

impl ScriptLoader for RhaiLoader {
    fn load(&self, source: &str) -> Result<LoadedScript, ScriptError> {
        let engine = self.engine();

        let ast = engine
            .compile(source)
            .map_err(|e| ScriptError::Compile(e.to_string()))?;

        // Top-level statements run once, in a scope owned by this script only
        let mut scope = Scope::new();
        engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| ScriptError::Eval(trace(&e)))?;

        let has_entry = ast
            .iter_functions()
            .any(|f| f.name == ENTRY_POINT && f.params.len() == 1);

        debug!(has_entry, functions = ast.iter_functions().count(), "script loaded");

        let entry = has_entry.then(|| {
            Box::new(RhaiEntryPoint { engine, ast, scope }) as Box<dyn EntryPoint>
        });

        Ok(LoadedScript { entry })
    }
}

/// `fn run(ctx)` of a loaded Rhai script
struct RhaiEntryPoint {
    engine: Engine,
    ast: AST,
    scope: Scope<'static>,
}

impl EntryPoint for RhaiEntryPoint {
    fn name(&self) -> &str {
        ENTRY_POINT
    }

    fn execute(&mut self, ctx: HostContext) -> Result<(), ScriptError> {
        // Top-level statements already ran during load
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);

        self.engine
            .call_fn_with_options::<Dynamic>(
                options,
                &mut self.scope,
                &self.ast,
                ENTRY_POINT,
                (ctx.into_dynamic(),),
            )
            .map(|_| ())
            .map_err(|e| ScriptError::Entry {
                name: ENTRY_POINT.to_string(),
                trace: trace(&e),
            })
    }
}

/// Render an evaluation error with every function-call frame it passed through
///
/// Frames are listed outermost first, followed by the error itself with its
/// line and position.
pub fn trace(err: &EvalAltResult) -> String {
    let mut frames = Vec::new();
    let mut current = err;

    while let EvalAltResult::ErrorInFunctionCall(name, source, inner, pos) = current {
        let source = if source.is_empty() {
            String::new()
        } else {
            format!(" in '{}'", source)
        };
        frames.push(format!("  in call to function '{}'{} ({})", name, source, pos));
        current = inner.as_ref();
    }

    let mut out = String::from("Traceback (outermost first):\n");
    for frame in &frames {
        out.push_str(frame);
        out.push('\n');
    }
    out.push_str(&current.to_string());
    out
}
