//! The boa-backed [`CodeLoader`] implementation.
//!
//! `compile` evaluates the source wrapped as `(function(require) { ... })`
//! in a fresh [`Context`], so malformed code fails before anything runs.
//! `run` installs the host module table, then calls the compiled function
//! exactly once with `require` as its sole argument.

use boa_engine::{Context, JsValue, Source};

use super::modules::ModuleRegistry;
use super::{CodeLoader, ExecError};

/// A compiled script together with the context it was compiled in. Owned by
/// a single invocation; dropped afterwards.
#[derive(Debug)]
pub struct CompiledScript {
    context: Context,
    function: JsValue,
}

/// Loader backed by the embedded boa JavaScript interpreter.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoaLoader;

impl CodeLoader for BoaLoader {
    type Unit = CompiledScript;

    fn compile(&self, source: &str) -> Result<CompiledScript, ExecError> {
        let mut context = Context::default();
        // Same shape the script sees at run time: a function body with a
        // single `require` parameter.
        let wrapped = format!("(function(require) {{\n{source}\n}})");
        let function = context
            .eval(Source::from_bytes(&wrapped))
            .map_err(|e| ExecError::Compile(e.to_string()))?;
        Ok(CompiledScript { context, function })
    }

    fn run(&self, unit: CompiledScript, modules: &ModuleRegistry) -> Result<(), ExecError> {
        let CompiledScript {
            mut context,
            function,
        } = unit;

        let require = modules
            .install(&mut context)
            .map_err(|e| ExecError::Runtime(e.to_string()))?;

        let callable = function
            .as_object()
            .filter(|o| o.is_callable())
            .ok_or_else(|| ExecError::Runtime("compiled script is not callable".into()))?;

        callable
            .call(&JsValue::undefined(), &[require], &mut context)
            .map_err(|e| ExecError::Runtime(e.to_string()))?;
        Ok(())
    }
}
