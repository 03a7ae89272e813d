//! Customization analysis endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use templup_core::errors::AnalyzerError;

use crate::api::status::AppError;
use crate::AppState;

/// One analyzed customization. Content bodies are included so the dashboard
/// can render a side-by-side diff.
#[derive(Serialize)]
struct CustomizationItem {
    file: String,
    customization_type: String,
    preservable: bool,
    original_content: String,
    customized_content: String,
    last_modified: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/templates/:id/customizations", get(analyze))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CustomizationItem>>, AppError> {
    let customizations = state.orchestrator.analyzer().analyze(&id).map_err(|e| match e {
        AnalyzerError::TemplateNotFound(_) => AppError::NotFound(e.to_string()),
        other => AppError::Internal(other.to_string()),
    })?;

    let items = customizations
        .into_iter()
        .map(|c| CustomizationItem {
            file: c.file,
            customization_type: c.customization_type.to_string(),
            preservable: c.preservable,
            original_content: c.original_content,
            customized_content: c.customized_content,
            last_modified: c.last_modified.to_rfc3339(),
        })
        .collect();

    Ok(Json(items))
}
