//! Axum-based HTTP surface of the gateway.
//!
//! [`HttpServer`] implements [`Component`] so it slots into the component
//! runtime: `run()` drives the axum event loop; the shared
//! [`CancellationToken`] is wired to axum's graceful shutdown.
//!
//! ## URL layout
//!
//! ```text
//! GET  /api/health
//! GET  /api/modules
//! POST /api/sync
//! *                → 404 through the error responder
//! ```
//!
//! When `sync.per_request` is configured, every request additionally fires
//! a detached sync attempt before being handled; the response never waits
//! on it.

mod api;
pub mod respond;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::runtime::{Component, ComponentFuture};
use crate::sync::SyncTrigger;

pub use respond::ServiceError;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone; all fields are reference-counted or small.
#[derive(Clone)]
pub(crate) struct AppState {
    /// Service name reported by the health endpoint.
    pub service_name: Arc<str>,
    /// Sync trigger, absent when the sync path is disabled.
    pub trigger: Option<Arc<SyncTrigger>>,
    /// Host module names exposed to scripts.
    pub modules: Arc<Vec<String>>,
}

// ── HttpServer ────────────────────────────────────────────────────────────────

pub struct HttpServer {
    bind_addr: String,
    state: AppState,
    sync_per_request: bool,
}

impl HttpServer {
    pub fn new(
        bind_addr: impl Into<String>,
        service_name: impl Into<Arc<str>>,
        trigger: Option<Arc<SyncTrigger>>,
        modules: Vec<String>,
        sync_per_request: bool,
    ) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            state: AppState {
                service_name: service_name.into(),
                trigger,
                modules: Arc::new(modules),
            },
            sync_per_request,
        }
    }
}

impl Component for HttpServer {
    fn id(&self) -> &str {
        "http"
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_server(
            self.bind_addr,
            self.state,
            self.sync_per_request,
            shutdown,
        ))
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

async fn run_server(
    bind_addr: String,
    state: AppState,
    sync_per_request: bool,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let router = build_router(state, sync_per_request);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Service(format!("http bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "http listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Service(format!("http server error: {e}")))?;

    info!("http shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the service router without binding a listener. Useful when the
/// gateway is embedded in another server or driven directly in tests.
pub fn router(
    service_name: impl Into<Arc<str>>,
    trigger: Option<Arc<SyncTrigger>>,
    modules: Vec<String>,
    sync_per_request: bool,
) -> Router {
    build_router(
        AppState {
            service_name: service_name.into(),
            trigger,
            modules: Arc::new(modules),
        },
        sync_per_request,
    )
}

fn build_router(state: AppState, sync_per_request: bool) -> Router {
    let mut router = Router::new()
        .route("/api/health", get(api::health))
        .route("/api/modules", get(api::modules))
        .route("/api/sync", post(api::sync_now))
        .fallback(api::not_found);

    if sync_per_request {
        router = router.layer(middleware::from_fn_with_state(state.clone(), sync_probe));
    }

    router.with_state(state)
}

/// Per-request sync middleware: fire and move on, the response never waits
/// on the fetch.
async fn sync_probe(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(trigger) = state.trigger.as_ref() {
        trigger.sync();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ModuleRegistry, ScriptExecutor};
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_state(trigger: Option<Arc<SyncTrigger>>) -> AppState {
        AppState {
            service_name: Arc::from("test"),
            trigger,
            modules: Arc::new(vec!["log".into(), "fs".into()]),
        }
    }

    fn test_trigger() -> Arc<SyncTrigger> {
        // No endpoint configured: sync() logs and returns, which is exactly
        // what the fire-and-forget responses should be indifferent to.
        let executor = Arc::new(ScriptExecutor::embedded(ModuleRegistry::default()));
        Arc::new(SyncTrigger::new(None, executor))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn req(method: &str, uri: &str) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_service_name() {
        let router = build_router(test_state(None), false);
        let response = router.oneshot(req("GET", "/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "status": "ok", "service": "test" })
        );
    }

    #[tokio::test]
    async fn modules_lists_the_registry() {
        let router = build_router(test_state(None), false);
        let response = router.oneshot(req("GET", "/api/modules")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "modules": ["log", "fs"] }));
    }

    #[tokio::test]
    async fn unknown_path_is_a_domain_404() {
        let router = build_router(test_state(None), false);
        let response = router.oneshot(req("GET", "/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "resource not found" })
        );
    }

    #[tokio::test]
    async fn sync_disabled_is_a_domain_409() {
        let router = build_router(test_state(None), false);
        let response = router.oneshot(req("POST", "/api/sync")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "config sync is disabled" })
        );
    }

    #[tokio::test]
    async fn sync_accepted_even_when_endpoint_is_unusable() {
        let router = build_router(test_state(Some(test_trigger())), false);
        let response = router.oneshot(req("POST", "/api/sync")).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await, json!({ "status": "accepted" }));
    }

    #[tokio::test]
    async fn per_request_sync_does_not_disturb_responses() {
        let router = build_router(test_state(Some(test_trigger())), true);
        let response = router.oneshot(req("GET", "/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
