//! Vetiver gateway entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at the configured level
//!   4. Wire executor, sync trigger, components
//!   5. Run until ctrl-c

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use vetiver::config;
use vetiver::error::AppError;
use vetiver::exec::{ModuleRegistry, ScriptExecutor};
use vetiver::http::HttpServer;
use vetiver::logger;
use vetiver::runtime::{Component, spawn_components};
use vetiver::sync::{SyncTicker, SyncTrigger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::init(&config.log_level)?;

    info!(
        service = %config.service_name,
        log_level = %config.log_level,
        sync_enabled = config.sync.enabled,
        "config loaded"
    );

    let trigger = if config.sync.enabled {
        let executor = Arc::new(ScriptExecutor::embedded(ModuleRegistry::with_modules(
            config.modules.iter().cloned(),
        )));
        Some(Arc::new(SyncTrigger::new(
            config.sync.endpoint.clone(),
            executor,
        )))
    } else {
        None
    };

    let mut components: Vec<Box<dyn Component>> = Vec::new();

    if config.http.enabled {
        components.push(Box::new(HttpServer::new(
            config.http.bind.clone(),
            config.service_name.clone(),
            trigger.clone(),
            config.modules.clone(),
            config.sync.per_request,
        )));
    }

    if let Some(trigger) = &trigger {
        if config.sync.interval_secs > 0 {
            components.push(Box::new(SyncTicker::new(
                Arc::clone(trigger),
                Duration::from_secs(config.sync.interval_secs),
            )));
        }
    }

    if components.is_empty() {
        return Err(AppError::Config(
            "nothing to run: http and sync are both disabled".into(),
        ));
    }

    let shutdown = CancellationToken::new();
    let handle = spawn_components(components, shutdown.clone());

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c received, shutting down");
                shutdown.cancel();
            }
        }
    });

    handle.join().await
}
