//! Audit log endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::status::AppError;
use crate::AppState;

#[derive(Deserialize)]
pub struct AuditQuery {
    pub per_page: Option<u32>,
}

#[derive(Serialize)]
struct AuditItem {
    id: i64,
    action: String,
    template_id: Option<String>,
    details: Option<String>,
    success: bool,
    created_at: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/audit", get(list_audit))
}

async fn list_audit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditItem>>, AppError> {
    let limit = query.per_page.unwrap_or(50).min(500);
    let entries = state
        .db
        .list_audit_log(limit)
        .map_err(|e| AppError::Internal(format!("database error: {e}")))?;

    let items = entries
        .into_iter()
        .map(|e| AuditItem {
            id: e.id,
            action: e.action,
            template_id: e.template_id,
            details: e.details,
            success: e.success,
            created_at: e.created_at,
        })
        .collect();

    Ok(Json(items))
}
