//! Conflict review and resolution endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use templup_core::errors::MergeError;
use templup_core::merge::{ConflictResolver, Resolution};

use crate::api::status::AppError;
use crate::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ListConflictsQuery {
    pub per_page: Option<u32>,
    pub status: Option<String>,
}

#[derive(Serialize)]
struct ConflictListItem {
    id: String,
    file_path: String,
    customization_type: String,
    target_version: String,
    status: String,
}

#[derive(Serialize)]
struct ConflictDetail {
    id: String,
    template_id: String,
    file_path: String,
    customization_type: String,
    target_version: String,
    base_content: Option<String>,
    customized_content: Option<String>,
    incoming_content: Option<String>,
    status: String,
    resolution: Option<String>,
    resolved_by: Option<String>,
}

#[derive(Deserialize)]
pub struct ResolveConflictRequest {
    /// `keep_customized`, `accept_incoming`, or `manual`.
    pub resolution: String,
    /// Required when `resolution` is `manual`.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub resolved_by: Option<String>,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/templates/:id/conflicts", get(list_conflicts))
        .route("/api/conflicts/:id", get(get_conflict))
        .route("/api/conflicts/:id/resolve", post(resolve_conflict))
        .route("/api/conflicts/:id/discard", post(discard_conflict))
}

async fn list_conflicts(
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<String>,
    Query(query): Query<ListConflictsQuery>,
) -> Result<Json<Vec<ConflictListItem>>, AppError> {
    let limit = query.per_page.unwrap_or(20).min(100);
    let entries = state
        .db
        .list_conflicts(&template_id, query.status.as_deref(), limit)
        .map_err(|e| AppError::Internal(format!("database error: {e}")))?;

    let items = entries
        .into_iter()
        .map(|c| ConflictListItem {
            id: c.id,
            file_path: c.file_path,
            customization_type: c.customization_type.to_string(),
            target_version: c.target_version,
            status: c.status,
        })
        .collect();

    Ok(Json(items))
}

async fn get_conflict(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConflictDetail>, AppError> {
    let conflict = state
        .db
        .get_conflict(&id)
        .map_err(|e| AppError::Internal(format!("database error: {e}")))?
        .ok_or_else(|| AppError::NotFound(format!("conflict '{id}' not found")))?;

    Ok(Json(ConflictDetail {
        id: conflict.id,
        template_id: conflict.template_id,
        file_path: conflict.file_path,
        customization_type: conflict.customization_type.to_string(),
        target_version: conflict.target_version,
        base_content: conflict.base_content,
        customized_content: conflict.customized_content,
        incoming_content: conflict.incoming_content,
        status: conflict.status,
        resolution: conflict.resolution,
        resolved_by: conflict.resolved_by,
    }))
}

async fn resolve_conflict(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ResolveConflictRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let resolution = match body.resolution.as_str() {
        "keep_customized" => Resolution::KeepCustomized,
        "accept_incoming" => Resolution::AcceptIncoming,
        "manual" => {
            let content = body.content.clone().ok_or_else(|| {
                AppError::BadRequest("manual resolution requires 'content'".to_string())
            })?;
            Resolution::Manual(content)
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "invalid resolution '{other}': must be keep_customized, accept_incoming, or manual"
            )));
        }
    };

    let resolved_by = body.resolved_by.as_deref().unwrap_or("api");
    ConflictResolver::apply(&id, &resolution, resolved_by, &state.db).map_err(map_merge_err)?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!("conflict {} resolved", id),
    })))
}

async fn discard_conflict(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    ConflictResolver::discard(&id, "api", &state.db).map_err(map_merge_err)?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!("conflict {} discarded", id),
    })))
}

fn map_merge_err(e: MergeError) -> AppError {
    match e {
        MergeError::ConflictNotFound(_) => AppError::NotFound(e.to_string()),
        MergeError::AlreadyResolved(_) => AppError::Conflict(e.to_string()),
        MergeError::InvalidResolution { .. } => AppError::BadRequest(e.to_string()),
        other => AppError::Internal(other.to_string()),
    }
}
