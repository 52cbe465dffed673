//! Terminal error-to-response conversion for the HTTP boundary.
//!
//! Every failure a handler can produce is funneled through [`ServiceError`]
//! and converted into exactly one JSON response. Classification is a closed
//! sum: either the application tagged the failure with a status and a
//! client-safe message, or the client gets a generic 500 and the detail
//! goes only to the log.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error::AppError;

/// Body message for everything that is not a [`ServiceError::Domain`].
const GENERIC_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Application-classified failure, surfaced verbatim to the client.
    #[error("{message}")]
    Domain { status: StatusCode, message: String },

    /// Anything else. The wrapped detail is logged, never sent.
    #[error("unclassified error: {0}")]
    Unclassified(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ServiceError {
    pub fn domain(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Domain {
            status,
            message: message.into(),
        }
    }

    pub fn unclassified(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unclassified(Box::new(err))
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        Self::unclassified(err)
    }
}

impl IntoResponse for ServiceError {
    /// Produces exactly one response and never panics: unknown shapes are
    /// unrepresentable, so everything lands in one of the two arms.
    fn into_response(self) -> Response {
        // Operator visibility first, regardless of classification.
        error!(error = %self, "request failed");

        match self {
            Self::Domain { status, message } => {
                (status, Json(json!({ "error": message }))).into_response()
            }
            Self::Unclassified(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": GENERIC_ERROR_MESSAGE })),
            )
                .into_response(),
        }
    }
}
