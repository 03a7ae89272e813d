//! Backup management endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use templup_core::errors::BackupError;

use crate::api::status::AppError;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListBackupsQuery {
    pub per_page: Option<u32>,
}

#[derive(Serialize)]
struct BackupItem {
    id: String,
    template_id: String,
    created_at: String,
    expires_at: String,
    retention_days: u32,
    used_for_rollback: bool,
    rollback_date: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/templates/:id/backups",
            get(list_backups).post(create_backup),
        )
        .route("/api/backups/purge", post(purge_expired))
}

async fn create_backup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let backup = state
        .orchestrator
        .backups()
        .create_backup(&id)
        .map_err(map_backup_err)?;

    info!(template_id = %id, backup_id = %backup.id, "backup created via API");
    Ok(Json(serde_json::json!({
        "ok": true,
        "backup_id": backup.id,
    })))
}

async fn list_backups(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ListBackupsQuery>,
) -> Result<Json<Vec<BackupItem>>, AppError> {
    let limit = query.per_page.unwrap_or(20).min(100);
    let backups = state
        .orchestrator
        .backups()
        .list_backups(&id, limit)
        .map_err(map_backup_err)?;

    let items = backups
        .into_iter()
        .map(|b| BackupItem {
            id: b.id.clone(),
            template_id: b.template_id.clone(),
            created_at: b.timestamp.to_rfc3339(),
            expires_at: b.expires_at().to_rfc3339(),
            retention_days: b.retention_days,
            used_for_rollback: b.used_for_rollback,
            rollback_date: b.rollback_date.map(|d| d.to_rfc3339()),
        })
        .collect();

    Ok(Json(items))
}

async fn purge_expired(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let purged = state
        .orchestrator
        .backups()
        .purge_expired()
        .map_err(map_backup_err)?;
    Ok(Json(serde_json::json!({ "ok": true, "purged": purged })))
}

fn map_backup_err(e: BackupError) -> AppError {
    match e {
        BackupError::NotFound { .. } | BackupError::Expired { .. } => {
            AppError::NotFound(e.to_string())
        }
        other => AppError::Internal(other.to_string()),
    }
}
