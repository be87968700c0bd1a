use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /projects/{user_id}: every project document of one user.
///
/// Without storage configured this answers an empty list with
/// `storageEnabled: false` so clients fall back to their local cache.
pub async fn list_projects(
    State(app): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let projects = match app.documents.clone() {
        Some(store) => {
            let user = user_id.clone();
            tokio::task::spawn_blocking(move || store.list(&user))
                .await
                .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??
        }
        None => Vec::new(),
    };
    tracing::debug!(user = %user_id, count = projects.len(), "listed projects");

    Ok(Json(serde_json::json!({
        "metadata": {
            "userId": user_id,
            "count": projects.len(),
            "fetchedAt": chrono::Utc::now(),
            "storageEnabled": app.storage_enabled(),
        },
        "projects": projects,
    })))
}

/// POST /projects/{user_id}: upsert one project document. Top-level fields
/// of the body overwrite the stored ones; fields absent from the body are
/// kept.
pub async fn save_project(
    State(app): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(doc) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let project_id = match doc.get("id").and_then(|v| v.as_str()) {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => return Err(AppError::bad_request("project id is required")),
    };
    let store = app.documents.clone().ok_or_else(AppError::storage_disabled)?;

    let user = user_id.clone();
    let id = project_id.clone();
    tokio::task::spawn_blocking(move || store.upsert(&user, &id, doc))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    tracing::debug!(user = %user_id, project = %project_id, "saved project");

    Ok(Json(serde_json::json!({
        "success": true,
        "metadata": {
            "projectId": project_id,
            "savedAt": chrono::Utc::now(),
        },
    })))
}

/// DELETE /projects/{user_id}/{project_id}: deleting an absent project
/// succeeds.
pub async fn delete_project(
    State(app): State<AppState>,
    Path((user_id, project_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.documents.clone().ok_or_else(AppError::storage_disabled)?;

    let user = user_id.clone();
    let id = project_id.clone();
    let removed = tokio::task::spawn_blocking(move || store.delete(&user, &id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    tracing::debug!(user = %user_id, project = %project_id, removed, "deleted project");

    Ok(Json(serde_json::json!({ "success": true })))
}
