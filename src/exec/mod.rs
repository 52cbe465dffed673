//! Script execution: compile a fetched code string and run it once with
//! access to the host module table.
//!
//! The loader seam is a trait so the execution engine is swappable and the
//! surrounding plumbing is testable without an interpreter. Containment
//! points are deliberate and asymmetric:
//!
//! - a non-string candidate is rejected here, with a log line and nothing
//!   else;
//! - a compile failure is contained here, logged with the underlying
//!   message;
//! - a *runtime* failure of the compiled script is NOT contained here. It
//!   propagates to the caller, which in the sync wiring is a detached task
//!   nobody joins.
//!
//! Nothing is cached: each invocation compiles, runs, and discards its
//! unit and source.

mod loader;
mod modules;

pub use loader::{BoaLoader, CompiledScript};
pub use modules::ModuleRegistry;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

// ── errors & outcomes ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("compile error: {0}")]
    Compile(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Terminal state of a contained `execute` call. Runtime failures are not
/// represented here; they surface as `Err(ExecError::Runtime(..))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Candidate was not a string; nothing was compiled or invoked.
    Rejected,
    /// Candidate failed to compile; nothing was invoked.
    CompileFailed,
    /// The compiled script was invoked once and returned normally.
    Completed,
}

// ── loader seam ───────────────────────────────────────────────────────────────

/// Compile-and-run seam for the execution engine.
pub trait CodeLoader {
    type Unit;

    /// Turn a source string into an invocable unit.
    fn compile(&self, source: &str) -> Result<Self::Unit, ExecError>;

    /// Invoke the unit exactly once, handing it `modules` as its only
    /// capability.
    fn run(&self, unit: Self::Unit, modules: &ModuleRegistry) -> Result<(), ExecError>;
}

// ── executor ──────────────────────────────────────────────────────────────────

/// Entry point the sync path hands fetched candidates to.
pub trait ScriptSink: Send + Sync + 'static {
    fn submit(&self, candidate: &Value) -> Result<Outcome, ExecError>;
}

/// Drives one candidate through validate, compile, invoke.
pub struct ScriptExecutor<L: CodeLoader = BoaLoader> {
    loader: L,
    modules: ModuleRegistry,
}

impl<L: CodeLoader> ScriptExecutor<L> {
    pub fn new(loader: L, modules: ModuleRegistry) -> Self {
        Self { loader, modules }
    }

    /// Validate, compile, and invoke `candidate`.
    ///
    /// Rejection and compile failure are contained (logged, `Ok`); an error
    /// raised by the running script propagates to the caller.
    pub fn execute(&self, candidate: &Value) -> Result<Outcome, ExecError> {
        let Some(source) = candidate.as_str() else {
            warn!("invalid runtime-config candidate, expected a string");
            return Ok(Outcome::Rejected);
        };

        let unit = match self.loader.compile(source) {
            Ok(unit) => unit,
            Err(e) => {
                warn!(error = %e, "runtime-config script failed to compile");
                return Ok(Outcome::CompileFailed);
            }
        };

        self.loader.run(unit, &self.modules)?;
        Ok(Outcome::Completed)
    }
}

impl ScriptExecutor<BoaLoader> {
    /// Executor with the embedded interpreter and the given host modules.
    pub fn embedded(modules: ModuleRegistry) -> Self {
        Self::new(BoaLoader, modules)
    }
}

impl<L> ScriptSink for ScriptExecutor<L>
where
    L: CodeLoader + Send + Sync + 'static,
{
    fn submit(&self, candidate: &Value) -> Result<Outcome, ExecError> {
        self.execute(candidate)
    }
}
