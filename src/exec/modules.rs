//! Host module table exposed to compiled scripts through `require`.
//!
//! Each module is a namespace object of native functions built with
//! [`ObjectInitializer`]. The registry installs the table as a hidden
//! global, then hands out a native `require` function that resolves
//! specifiers against it. Unknown specifiers throw a `TypeError`, which
//! surfaces as a script runtime error.

use std::collections::BTreeSet;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use boa_engine::object::{FunctionObjectBuilder, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::{
    Context, JsNativeError, JsResult, JsString, JsValue, NativeFunction, js_string,
};
use tracing::{error, info, warn};

/// Global property name the module table is installed under.
const MODULE_TABLE: &str = "__vetiver_modules";

/// The set of host modules a script context gets access to.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    enabled: BTreeSet<String>,
}

impl ModuleRegistry {
    /// Registry restricted to the given module names. Unknown names are
    /// kept; they simply never resolve.
    pub fn with_modules<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Module names this registry will resolve, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.enabled.iter().map(String::as_str)
    }

    /// Install the module table into `context` and return the `require`
    /// function to pass to a compiled script.
    pub fn install(&self, context: &mut Context) -> JsResult<JsValue> {
        let table = ObjectInitializer::new(context).build();
        for name in &self.enabled {
            let Some(namespace) = build_module(name, context)? else {
                continue;
            };
            table.set(JsString::from(name.as_str()), namespace, false, context)?;
        }
        context.register_global_property(js_string!(MODULE_TABLE), table, Attribute::all())?;

        let require =
            FunctionObjectBuilder::new(context.realm(), NativeFunction::from_fn_ptr(require_impl))
                .name(js_string!("require"))
                .length(1)
                .constructor(false)
                .build();
        Ok(require.into())
    }
}

impl Default for ModuleRegistry {
    /// All host modules this build knows about.
    fn default() -> Self {
        Self::with_modules(["encoding", "env", "fs", "log", "sys"])
    }
}

/// The `require` native: look the specifier up in the installed table.
fn require_impl(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let specifier = args
        .first()
        .and_then(|v| v.as_string())
        .map(|s| s.to_std_string_escaped())
        .ok_or_else(|| JsNativeError::typ().with_message("module specifier must be a string"))?;

    let table = context
        .global_object()
        .get(js_string!(MODULE_TABLE), context)?;
    let table = table
        .as_object()
        .ok_or_else(|| JsNativeError::typ().with_message("host module table is missing"))?;

    let namespace = table.get(JsString::from(specifier.as_str()), context)?;
    if namespace.is_undefined() {
        return Err(JsNativeError::typ()
            .with_message(format!("Cannot find module '{specifier}'"))
            .into());
    }
    Ok(namespace)
}

/// Build the namespace object for a known module name.
fn build_module(name: &str, context: &mut Context) -> JsResult<Option<JsValue>> {
    let namespace = match name {
        "fs" => {
            let mut initializer = ObjectInitializer::new(context);
            initializer
                .function(NativeFunction::from_fn_ptr(fs_read_file), js_string!("readFile"), 1)
                .function(NativeFunction::from_fn_ptr(fs_write_file), js_string!("writeFile"), 2)
                .function(NativeFunction::from_fn_ptr(fs_exists), js_string!("exists"), 1);
            initializer.build()
        }
        "env" => {
            let mut initializer = ObjectInitializer::new(context);
            initializer.function(NativeFunction::from_fn_ptr(env_get), js_string!("get"), 1);
            initializer.build()
        }
        "encoding" => {
            let mut initializer = ObjectInitializer::new(context);
            initializer
                .function(NativeFunction::from_fn_ptr(encoding_b64encode), js_string!("b64encode"), 1)
                .function(NativeFunction::from_fn_ptr(encoding_b64decode), js_string!("b64decode"), 1);
            initializer.build()
        }
        "log" => {
            let mut initializer = ObjectInitializer::new(context);
            initializer
                .function(NativeFunction::from_fn_ptr(log_info), js_string!("info"), 1)
                .function(NativeFunction::from_fn_ptr(log_warn), js_string!("warn"), 1)
                .function(NativeFunction::from_fn_ptr(log_error), js_string!("error"), 1);
            initializer.build()
        }
        "sys" => {
            let mut initializer = ObjectInitializer::new(context);
            initializer
                .function(NativeFunction::from_fn_ptr(sys_platform), js_string!("platform"), 0)
                .function(NativeFunction::from_fn_ptr(sys_cwd), js_string!("cwd"), 0)
                .function(NativeFunction::from_fn_ptr(sys_pid), js_string!("pid"), 0);
            initializer.build()
        }
        _ => return Ok(None),
    };
    Ok(Some(namespace.into()))
}

// ── natives ───────────────────────────────────────────────────────────────────

fn required_string_arg(args: &[JsValue], index: usize, name: &str) -> JsResult<String> {
    args.get(index)
        .and_then(|v| v.as_string())
        .map(|s| s.to_std_string_escaped())
        .ok_or_else(|| {
            JsNativeError::typ()
                .with_message(format!("{name} must be a string"))
                .into()
        })
}

fn fs_read_file(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let path = required_string_arg(args, 0, "path")?;
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| JsNativeError::error().with_message(format!("readFile '{path}': {e}")))?;
    Ok(JsValue::from(js_string!(contents)))
}

fn fs_write_file(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let path = required_string_arg(args, 0, "path")?;
    let contents = required_string_arg(args, 1, "contents")?;
    std::fs::write(&path, contents)
        .map_err(|e| JsNativeError::error().with_message(format!("writeFile '{path}': {e}")))?;
    Ok(JsValue::undefined())
}

fn fs_exists(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let path = required_string_arg(args, 0, "path")?;
    Ok(JsValue::from(std::path::Path::new(&path).exists()))
}

fn env_get(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let name = required_string_arg(args, 0, "name")?;
    match std::env::var(&name) {
        Ok(value) => Ok(JsValue::from(js_string!(value))),
        Err(_) => Ok(JsValue::undefined()),
    }
}

fn encoding_b64encode(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let input = required_string_arg(args, 0, "input")?;
    Ok(JsValue::from(js_string!(BASE64_STANDARD.encode(input))))
}

fn encoding_b64decode(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let input = required_string_arg(args, 0, "input")?;
    let decoded = BASE64_STANDARD
        .decode(input.as_bytes())
        .map_err(|_| JsNativeError::typ().with_message("invalid base64 input"))?;
    let s = String::from_utf8(decoded)
        .map_err(|_| JsNativeError::typ().with_message("decoded bytes are not UTF-8"))?;
    Ok(JsValue::from(js_string!(s)))
}

fn log_info(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let msg = required_string_arg(args, 0, "message")?;
    info!(target: "script", "{msg}");
    Ok(JsValue::undefined())
}

fn log_warn(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let msg = required_string_arg(args, 0, "message")?;
    warn!(target: "script", "{msg}");
    Ok(JsValue::undefined())
}

fn log_error(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let msg = required_string_arg(args, 0, "message")?;
    error!(target: "script", "{msg}");
    Ok(JsValue::undefined())
}

fn sys_platform(_this: &JsValue, _args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(js_string!(std::env::consts::OS)))
}

fn sys_cwd(_this: &JsValue, _args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let cwd = std::env::current_dir()
        .map_err(|e| JsNativeError::error().with_message(format!("cwd: {e}")))?;
    Ok(JsValue::from(js_string!(cwd.display().to_string())))
}

fn sys_pid(_this: &JsValue, _args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(std::process::id()))
}
