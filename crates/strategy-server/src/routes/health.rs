use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /health: liveness plus which optional backends are configured.
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "aiEnabled": app.ai_enabled(),
        "storageEnabled": app.storage_enabled(),
        "timestamp": chrono::Utc::now(),
    }))
}
