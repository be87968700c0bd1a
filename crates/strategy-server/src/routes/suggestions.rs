use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use strategy_core::suggest::SuggestionRequest;

use crate::ai::{build_prompt, extract_ideas};
use crate::error::AppError;
use crate::state::AppState;

/// POST /suggestions: ask the generative backend for ideas for one
/// framework category.
pub async fn suggest(
    State(app): State<AppState>,
    payload: Result<Json<SuggestionRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    request
        .validate()
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    let backend = app.ai.clone().ok_or_else(AppError::ai_disabled)?;

    let prompt = build_prompt(&request);
    let text = backend.generate(&prompt).await.map_err(|e| {
        tracing::warn!(backend = backend.name(), error = %format!("{e:#}"), "generation failed");
        AppError::ai_failed(format!("{e:#}"))
    })?;
    let ideas = extract_ideas(&text).map_err(|e| {
        tracing::warn!(backend = backend.name(), error = %format!("{e:#}"), "unusable model output");
        AppError::ai_failed(format!("{e:#}"))
    })?;

    tracing::info!(
        framework = %request.framework_key,
        item = %request.item_title,
        count = ideas.len(),
        "generated suggestions"
    );
    Ok(Json(serde_json::json!({ "ideas": ideas })))
}
