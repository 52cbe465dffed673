//! Axum handlers for `/api/*` routes.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::AppState;
use super::respond::ServiceError;

/// GET /api/health
pub(super) async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": state.service_name.as_ref() }))
}

/// GET /api/modules, the host modules exposed to fetched scripts.
pub(super) async fn modules(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "modules": &*state.modules }))
}

/// POST /api/sync: fire one sync attempt.
///
/// Accepted as soon as the attempt is dispatched: the fetch is detached,
/// so a later transport or script failure never changes this response.
pub(super) async fn sync_now(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let Some(trigger) = state.trigger.as_ref() else {
        return Err(ServiceError::domain(
            StatusCode::CONFLICT,
            "config sync is disabled",
        ));
    };

    trigger.sync();
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))).into_response())
}

/// Fallback for unknown paths, routed through the error responder so the
/// body shape matches every other failure.
pub(super) async fn not_found() -> ServiceError {
    ServiceError::domain(StatusCode::NOT_FOUND, "resource not found")
}
