//! Heartbeat endpoint and the shared handler error type.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, warn};

use treestatus_core::errors::{FormError, RemoteApiError, ResolveError};

use crate::render;
use crate::AppState;

/// Health check response.
#[derive(Serialize)]
struct HeartbeatResponse {
    ok: bool,
    version: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/__heartbeat__", get(heartbeat))
}

async fn heartbeat() -> Json<HeartbeatResponse> {
    Json(HeartbeatResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ---------------------------------------------------------------------------
// Shared error type for page handlers
// ---------------------------------------------------------------------------

/// Handler error rendered as an HTML error page.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request: bad id, no or several actions selected.
    BadRequest(String),
    /// Submitted form failed validation.
    Form(FormError),
    /// The requested page does not exist.
    NotFound(String),
    /// The Treestatus API refused a change with a user-facing detail.
    Rejected(String),
    /// A read from the Treestatus API failed with a user-facing detail.
    Upstream { status: u16, detail: String },
    /// Anything unexpected.
    Internal(String),
}

impl From<ResolveError> for AppError {
    fn from(e: ResolveError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<FormError> for AppError {
    fn from(e: FormError) -> Self {
        AppError::Form(e)
    }
}

impl From<RemoteApiError> for AppError {
    fn from(e: RemoteApiError) -> Self {
        if let RemoteApiError::InvalidPath(name) = &e {
            return AppError::NotFound(format!("No tree {} found.", name));
        }
        match (e.detail(), e.status()) {
            (Some(detail), Some(status)) => AppError::Upstream {
                status,
                detail: detail.to_string(),
            },
            (Some(detail), None) => AppError::Upstream {
                status: 502,
                detail: detail.to_string(),
            },
            _ => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, heading, messages) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", vec![msg]),
            AppError::Form(e) => (
                StatusCode::BAD_REQUEST,
                "Invalid submission",
                e.errors.into_iter().map(|f| f.message).collect(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", vec![msg]),
            AppError::Rejected(detail) => (StatusCode::BAD_REQUEST, "Update failed", vec![detail]),
            AppError::Upstream { status, detail } => {
                let code = StatusCode::from_u16(status)
                    .ok()
                    .filter(|c| c.is_client_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (code, "Treestatus error", vec![detail])
            }
            AppError::Internal(msg) => {
                error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error",
                    vec!["An unexpected error occurred.".to_string()],
                )
            }
        };

        if status.is_client_error() {
            warn!(status = status.as_u16(), ?messages, "request failed");
        }
        (status, Html(render::error_page(heading, &messages))).into_response()
    }
}
