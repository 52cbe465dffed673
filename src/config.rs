//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `VETIVER_LOG_LEVEL` and `VETIVER_SYNC_ENDPOINT` env
//! overrides.

use std::{env, fs, path::Path};

use serde::Deserialize;

use crate::error::AppError;

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whether the HTTP listener is enabled.
    pub enabled: bool,
    /// Socket address to bind the listener to.
    pub bind: String,
}

/// Runtime-config sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Whether the sync path is active at all.
    pub enabled: bool,
    /// Base64-encoded URL of the remote runtime-config endpoint. Kept
    /// encoded here; decoded once per sync attempt.
    pub endpoint: Option<String>,
    /// Interval between background sync attempts. `0` disables the ticker.
    pub interval_secs: u64,
    /// Fire a sync attempt on every inbound API request.
    pub per_request: bool,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    pub log_level: String,
    pub http: HttpConfig,
    pub sync: SyncConfig,
    /// Host modules exposed to fetched scripts through `require`.
    pub modules: Vec<String>,
}

/// Raw TOML shape, `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    service: RawService,
    #[serde(default)]
    http: RawHttp,
    #[serde(default)]
    sync: RawSync,
    #[serde(default)]
    modules: RawModules,
}

#[derive(Deserialize)]
struct RawService {
    #[serde(default = "default_service_name")]
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawService {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Deserialize)]
struct RawHttp {
    /// Defaults to `true`: the gateway is first of all an HTTP service.
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_http_bind")]
    bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_http_bind(),
        }
    }
}

#[derive(Deserialize)]
struct RawSync {
    /// Defaults to `false`: fetching remote code must be opted into.
    #[serde(default = "default_false")]
    enabled: bool,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default = "default_sync_interval")]
    interval_secs: u64,
    #[serde(default = "default_false")]
    per_request: bool,
}

impl Default for RawSync {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            interval_secs: default_sync_interval(),
            per_request: false,
        }
    }
}

#[derive(Deserialize, Default)]
struct RawModules {
    #[serde(default)]
    enabled: Option<Vec<String>>,
}

fn default_service_name() -> String {
    "vetiver".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_sync_interval() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Host modules exposed when `[modules].enabled` is absent.
pub fn default_modules() -> Vec<String> {
    ["encoding", "env", "fs", "log", "sys"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let log_level_override = env::var("VETIVER_LOG_LEVEL").ok();
    let endpoint_override = env::var("VETIVER_SYNC_ENDPOINT").ok();
    load_from(
        Path::new("config/default.toml"),
        log_level_override.as_deref(),
        endpoint_override.as_deref(),
    )
}

/// Internal loader accepting an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    endpoint_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let log_level = log_level_override
        .unwrap_or(&parsed.service.log_level)
        .to_string();
    let endpoint = endpoint_override
        .map(ToString::to_string)
        .or(parsed.sync.endpoint);

    Ok(Config {
        service_name: parsed.service.name,
        log_level,
        http: HttpConfig {
            enabled: parsed.http.enabled,
            bind: parsed.http.bind,
        },
        sync: SyncConfig {
            enabled: parsed.sync.enabled,
            endpoint,
            interval_secs: parsed.sync.interval_secs,
            per_request: parsed.sync.per_request,
        },
        modules: parsed.modules.enabled.unwrap_or_else(default_modules),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[service]
name = "test-gateway"
log_level = "info"
"#;

    const FULL_TOML: &str = r#"
[service]
name = "test-gateway"
log_level = "debug"

[http]
enabled = false
bind = "127.0.0.1:9999"

[sync]
enabled = true
endpoint = "aGVsbG8="
interval_secs = 60
per_request = true

[modules]
enabled = ["log"]
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_minimal_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.service_name, "test-gateway");
        assert_eq!(cfg.log_level, "info");
        // defaults kick in for the absent sections
        assert!(cfg.http.enabled);
        assert_eq!(cfg.http.bind, "127.0.0.1:8080");
        assert!(!cfg.sync.enabled);
        assert_eq!(cfg.sync.endpoint, None);
        assert_eq!(cfg.sync.interval_secs, 300);
        assert_eq!(cfg.modules, default_modules());
    }

    #[test]
    fn parse_full_config() {
        let f = write_toml(FULL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert!(!cfg.http.enabled);
        assert_eq!(cfg.http.bind, "127.0.0.1:9999");
        assert!(cfg.sync.enabled);
        assert_eq!(cfg.sync.endpoint.as_deref(), Some("aGVsbG8="));
        assert_eq!(cfg.sync.interval_secs, 60);
        assert!(cfg.sync.per_request);
        assert_eq!(cfg.modules, vec!["log".to_string()]);
    }

    #[test]
    fn empty_file_resolves_to_defaults() {
        let f = write_toml("");
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.service_name, "vetiver");
        assert!(!cfg.sync.enabled);
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), None, None);
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn log_level_override_wins() {
        let f = write_toml(FULL_TOML);
        let cfg = load_from(f.path(), Some("trace"), None).unwrap();
        assert_eq!(cfg.log_level, "trace");
    }

    #[test]
    fn endpoint_override_wins() {
        let f = write_toml(FULL_TOML);
        let cfg = load_from(f.path(), None, Some("d29ybGQ=")).unwrap();
        assert_eq!(cfg.sync.endpoint.as_deref(), Some("d29ybGQ="));
    }
}
