//! Update check, package inspection, update runs, deployment and rollback.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use templup_core::models::{UpdateReport, UpdateStatus};

use crate::api::status::{map_update_err, AppError};
use crate::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CheckUpdatesRequest {
    pub template_id: String,
    pub current_version: String,
}

#[derive(Deserialize)]
pub struct RunUpdateRequest {
    pub target_version: String,
    /// Defaults to preserving customizations; discarding them must be an
    /// explicit opt-out.
    #[serde(default = "default_true")]
    pub preserve_customizations: bool,
    #[serde(default)]
    pub auto_deploy: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct RollbackRequest {
    pub backup_id: String,
}

/// Package summary: file paths and flags, never the full payload bodies.
#[derive(Serialize)]
struct PackageFileItem {
    path: String,
    bytes: usize,
    preserve_customizations: bool,
    requires_manual_review: bool,
}

#[derive(Serialize)]
struct PackageResponse {
    version: String,
    breaking: bool,
    files: Vec<PackageFileItem>,
    migration: Option<String>,
    backup_retention_days: u32,
}

#[derive(Serialize)]
struct DeployResponse {
    deployment_id: String,
    status: String,
    url: Option<String>,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/updates/check", post(check_updates))
        .route("/api/updates/package/:version", get(get_update_package))
        .route("/api/templates/:id/update", post(run_update))
        .route("/api/templates/:id/deploy", post(trigger_deployment))
        .route("/api/templates/:id/rollback", post(rollback))
}

async fn check_updates(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CheckUpdatesRequest>,
) -> Result<Json<UpdateStatus>, AppError> {
    let status = state
        .orchestrator
        .check_updates(&body.template_id, &body.current_version)
        .map_err(map_update_err)?;
    Ok(Json(status))
}

async fn get_update_package(
    State(state): State<Arc<AppState>>,
    Path(version): Path<String>,
) -> Result<Json<PackageResponse>, AppError> {
    let package = state
        .orchestrator
        .registry()
        .package_for(&version)
        .map_err(|e| map_update_err(e.into()))?;

    Ok(Json(PackageResponse {
        version: package.version,
        breaking: package.breaking,
        files: package
            .files
            .iter()
            .map(|f| PackageFileItem {
                path: f.path.clone(),
                bytes: f.content.len(),
                preserve_customizations: f.preserve_customizations,
                requires_manual_review: f.requires_manual_review,
            })
            .collect(),
        migration: package.migration,
        backup_retention_days: package.backup_retention_days,
    }))
}

async fn run_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RunUpdateRequest>,
) -> Result<Json<UpdateReport>, AppError> {
    info!(
        template_id = %id,
        target_version = %body.target_version,
        preserve_customizations = body.preserve_customizations,
        auto_deploy = body.auto_deploy,
        "update requested"
    );
    let report = state
        .orchestrator
        .run_update(
            &id,
            &body.target_version,
            body.preserve_customizations,
            body.auto_deploy,
        )
        .await
        .map_err(map_update_err)?;
    Ok(Json(report))
}

async fn trigger_deployment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeployResponse>, AppError> {
    let deployment = state
        .orchestrator
        .trigger_deployment(&id)
        .await
        .map_err(map_update_err)?;

    Ok(Json(DeployResponse {
        deployment_id: deployment.id,
        status: deployment.status.to_string(),
        url: deployment.url,
    }))
}

async fn rollback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RollbackRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    info!(template_id = %id, backup_id = %body.backup_id, "rollback requested");
    state
        .orchestrator
        .rollback(&id, &body.backup_id)
        .map_err(map_update_err)?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!("template {} restored from backup {}", id, body.backup_id),
    })))
}
