//! Status and health check endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use templup_core::errors::{BackupError, UpdateError, VersionError};

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: String,
}

/// Per-template status response.
#[derive(Serialize)]
struct TemplateStatusResponse {
    template_id: String,
    name: String,
    current_version: String,
    state: String,
    update_in_flight: bool,
    pending_conflicts: i64,
    last_checked: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/status/health", get(health_check))
        .route("/api/templates/:id/status", get(get_template_status))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn get_template_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TemplateStatusResponse>, AppError> {
    let status = state.orchestrator.get_status(&id).map_err(map_update_err)?;

    Ok(Json(TemplateStatusResponse {
        update_in_flight: state.orchestrator.is_active(&id),
        template_id: status.template_id,
        name: status.name,
        current_version: status.current_version,
        state: status.state.to_string(),
        pending_conflicts: status.pending_conflicts,
        last_checked: status.last_checked,
    }))
}

// ---------------------------------------------------------------------------
// Shared error type for API handlers
// ---------------------------------------------------------------------------

/// Simple API error type that converts to an Axum response.
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (axum::http::StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

/// Map orchestrator errors onto HTTP statuses.
pub fn map_update_err(e: UpdateError) -> AppError {
    match e {
        UpdateError::TemplateNotFound(_) => AppError::NotFound(e.to_string()),
        UpdateError::AlreadyRunning(_) => AppError::Conflict(e.to_string()),
        UpdateError::InvalidStateTransition { .. } => AppError::Conflict(e.to_string()),
        UpdateError::VersionError(VersionError::NotFound(_)) => AppError::NotFound(e.to_string()),
        UpdateError::VersionError(VersionError::InvalidFormat(_)) => {
            AppError::BadRequest(e.to_string())
        }
        UpdateError::BackupError(BackupError::NotFound { .. })
        | UpdateError::BackupError(BackupError::Expired { .. }) => {
            AppError::NotFound(e.to_string())
        }
        other => AppError::Internal(other.to_string()),
    }
}
