//! Script execution gate
//!
//! Every received script passes through [`ExecutionGate::maybe_run`]. Unless
//! the policy opts into auto-execution, the operator sees a preview and must
//! confirm before anything is evaluated.

use cadrelay_core::RelayConfig;
use tracing::{debug, info, warn};

use crate::loader::{HostContext, RhaiLimits, RhaiLoader, ScriptLoader};
use crate::outcome::ExecutionOutcome;
use crate::preview::ScriptPreview;

/// Asks the operator whether a script may run
///
/// Blocks until answered; there is no timeout and no default answer.
pub trait Confirm {
    fn confirm(&mut self, preview: &ScriptPreview) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&ScriptPreview) -> bool,
{
    fn confirm(&mut self, preview: &ScriptPreview) -> bool {
        self(preview)
    }
}

/// Approves every script
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&mut self, _preview: &ScriptPreview) -> bool {
        true
    }
}

/// Declines every script
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&mut self, _preview: &ScriptPreview) -> bool {
        false
    }
}

/// When the gate may run a script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// Skip confirmation entirely
    pub auto_execute: bool,
    /// Characters of script shown in the preview
    pub preview_limit: usize,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            auto_execute: false,
            preview_limit: cadrelay_core::config::DEFAULT_PREVIEW_LIMIT,
        }
    }
}

impl From<&RelayConfig> for ExecutionPolicy {
    fn from(config: &RelayConfig) -> Self {
        Self {
            auto_execute: config.auto_execute,
            preview_limit: config.preview_limit,
        }
    }
}

/// The single point where received scripts are approved and run
pub struct ExecutionGate<L = RhaiLoader> {
    loader: L,
    policy: ExecutionPolicy,
}

impl ExecutionGate<RhaiLoader> {
    /// Gate backed by the Rhai loader, configured from relay settings
    pub fn from_config(config: &RelayConfig) -> Self {
        let loader = RhaiLoader::with_limits(RhaiLimits {
            max_operations: config.max_operations,
            ..RhaiLimits::default()
        });
        Self::new(loader, ExecutionPolicy::from(config))
    }
}

impl<L: ScriptLoader> ExecutionGate<L> {
    /// Create a gate with a loading strategy and a policy
    pub fn new(loader: L, policy: ExecutionPolicy) -> Self {
        Self { loader, policy }
    }

    /// The gate's policy
    pub fn policy(&self) -> ExecutionPolicy {
        self.policy
    }

    /// Decide whether to run `script`, run it if allowed, and report how it went
    pub fn maybe_run(
        &self,
        script: Option<&str>,
        confirm: &mut dyn Confirm,
        ctx: HostContext,
    ) -> ExecutionOutcome {
        let Some(script) = script.filter(|s| !s.is_empty()) else {
            debug!("no script to run");
            return ExecutionOutcome::NoScript;
        };

        if !self.policy.auto_execute {
            let preview = ScriptPreview::new(script, self.policy.preview_limit);
            if !confirm.confirm(&preview) {
                info!("script declined by operator");
                return ExecutionOutcome::DeclinedByUser;
            }
        }

        self.execute(script, ctx)
    }

    /// Run `script` without asking
    pub fn execute(&self, script: &str, ctx: HostContext) -> ExecutionOutcome {
        let loaded = match self.loader.load(script) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("script failed to load: {}", e);
                return ExecutionOutcome::ExecutedFailure { detail: e.to_string() };
            }
        };

        let Some(mut entry) = loaded.entry else {
            info!("script defines no entry point");
            return ExecutionOutcome::NoEntryPoint;
        };

        match entry.execute(ctx) {
            Ok(()) => {
                info!(entry = entry.name(), "script executed");
                ExecutionOutcome::ExecutedSuccess
            }
            Err(e) => {
                warn!(entry = entry.name(), "script faulted: {}", e);
                ExecutionOutcome::ExecutedFailure { detail: e.to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScriptError;
    use crate::host::DesignHandle;
    use crate::loader::LoadedScript;
    use std::cell::Cell;

    const BUILD_SCRIPT: &str = r#"
        fn run(ctx) {
            let s = ctx.add_sketch("xy");
            ctx.add_circle(s, 0.0, 0.0, 12.0);
            ctx.extrude(s, 20.0);
        }
    "#;

    fn confirm_first() -> ExecutionGate {
        ExecutionGate::new(RhaiLoader::new(), ExecutionPolicy::default())
    }

    fn auto() -> ExecutionGate {
        ExecutionGate::new(
            RhaiLoader::new(),
            ExecutionPolicy {
                auto_execute: true,
                ..ExecutionPolicy::default()
            },
        )
    }

    /// Counts loads so tests can prove a script was never evaluated
    struct CountingLoader {
        inner: RhaiLoader,
        loads: Cell<usize>,
    }

    impl ScriptLoader for CountingLoader {
        fn load(&self, source: &str) -> Result<LoadedScript, ScriptError> {
            self.loads.set(self.loads.get() + 1);
            self.inner.load(source)
        }
    }

    #[test]
    fn test_missing_script() {
        let gate = confirm_first();
        assert_eq!(
            gate.maybe_run(None, &mut AlwaysConfirm, HostContext::Detached),
            ExecutionOutcome::NoScript
        );
        assert_eq!(
            gate.maybe_run(Some(""), &mut AlwaysConfirm, HostContext::Detached),
            ExecutionOutcome::NoScript
        );
    }

    #[test]
    fn test_auto_execute_skips_confirmation() {
        let design = DesignHandle::new();
        let mut asked = false;
        let mut confirm = |_: &ScriptPreview| {
            asked = true;
            false
        };

        let outcome = auto().maybe_run(Some(BUILD_SCRIPT), &mut confirm, HostContext::Design(design.clone()));

        assert_eq!(outcome, ExecutionOutcome::ExecutedSuccess);
        assert!(!asked);
        assert_eq!(design.snapshot().bodies.len(), 1);
    }

    #[test]
    fn test_confirmed_script_runs() {
        let design = DesignHandle::new();
        let outcome = confirm_first().maybe_run(
            Some(BUILD_SCRIPT),
            &mut AlwaysConfirm,
            HostContext::Design(design.clone()),
        );
        assert_eq!(outcome, ExecutionOutcome::ExecutedSuccess);
        assert_eq!(design.snapshot().sketches.len(), 1);
    }

    #[test]
    fn test_declined_script_is_never_loaded() {
        let gate = ExecutionGate::new(
            CountingLoader {
                inner: RhaiLoader::new(),
                loads: Cell::new(0),
            },
            ExecutionPolicy::default(),
        );
        let design = DesignHandle::new();

        let outcome = gate.maybe_run(Some(BUILD_SCRIPT), &mut NeverConfirm, HostContext::Design(design.clone()));

        assert_eq!(outcome, ExecutionOutcome::DeclinedByUser);
        assert_eq!(gate.loader.loads.get(), 0);
        assert_eq!(design.snapshot(), crate::host::Design::default());
    }

    #[test]
    fn test_preview_is_truncated_for_confirmation() {
        let script = format!("fn run(ctx) {{ }}\n//{}", "x".repeat(5000));
        let mut seen = None;
        let mut confirm = |preview: &ScriptPreview| {
            seen = Some(preview.clone());
            false
        };

        confirm_first().maybe_run(Some(script.as_str()), &mut confirm, HostContext::Detached);

        let preview = seen.unwrap();
        assert!(preview.is_truncated());
        assert!(preview.text().ends_with(crate::preview::TRUNCATION_MARKER));
    }

    #[test]
    fn test_raising_entry_point() {
        let outcome = auto().maybe_run(
            Some(r#"fn run(ctx) { throw "sketch plane missing"; }"#),
            &mut AlwaysConfirm,
            HostContext::Detached,
        );
        match outcome {
            ExecutionOutcome::ExecutedFailure { detail } => {
                assert!(detail.contains("sketch plane missing"), "{detail}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_no_entry_point() {
        let outcome = auto().maybe_run(Some("let x = 40 + 2;"), &mut AlwaysConfirm, HostContext::Detached);
        assert_eq!(outcome, ExecutionOutcome::NoEntryPoint);
    }

    #[test]
    fn test_syntax_error_is_failure() {
        let outcome = auto().maybe_run(Some("fn run(ctx) {"), &mut AlwaysConfirm, HostContext::Detached);
        assert!(matches!(outcome, ExecutionOutcome::ExecutedFailure { .. }));
    }

    #[test]
    fn test_policy_from_config() {
        let config = RelayConfig {
            auto_execute: true,
            preview_limit: 12,
            ..RelayConfig::default()
        };
        let gate = ExecutionGate::from_config(&config);
        assert_eq!(
            gate.policy(),
            ExecutionPolicy {
                auto_execute: true,
                preview_limit: 12
            }
        );
    }
}
