use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use strategy_core::StrategyError;

// ---------------------------------------------------------------------------
// Internal sentinel for explicit status/code pairs
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP status and machine-readable code through the
/// `anyhow::Error` chain.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. The body is always
/// `{"error": <code>, "message": <text>}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn api(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self(
            ApiError {
                status,
                code,
                message: message.into(),
            }
            .into(),
        )
    }

    /// 400 for a request that is missing fields or cannot be parsed.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::api(StatusCode::BAD_REQUEST, "invalid_request", msg)
    }

    /// 503 when no generative backend is configured.
    pub fn ai_disabled() -> Self {
        Self::api(
            StatusCode::SERVICE_UNAVAILABLE,
            "ai_disabled",
            "AI suggestions are not configured on this server",
        )
    }

    /// 502 when the generative backend failed or answered nonsense.
    pub fn ai_failed(msg: impl Into<String>) -> Self {
        Self::api(StatusCode::BAD_GATEWAY, "ai_failed", msg)
    }

    /// 503 when no document store is configured.
    pub fn storage_disabled() -> Self {
        Self::api(
            StatusCode::SERVICE_UNAVAILABLE,
            "storage_disabled",
            "project storage is not configured on this server",
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(e) = self.0.downcast_ref::<ApiError>() {
            let body = serde_json::json!({ "error": e.code, "message": e.message });
            return (e.status, axum::Json(body)).into_response();
        }

        let (status, code) = if let Some(e) = self.0.downcast_ref::<StrategyError>() {
            match e {
                StrategyError::EmptyProjectName
                | StrategyError::EmptyIdeaText
                | StrategyError::UnknownFramework(_)
                | StrategyError::UnknownCategory { .. }
                | StrategyError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
                StrategyError::ProjectNotFound(_)
                | StrategyError::IdeaNotFound(_)
                | StrategyError::DocumentNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                StrategyError::NotConfigured(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "not_configured")
                }
                StrategyError::Remote { .. }
                | StrategyError::Transport(_)
                | StrategyError::Timeout(_)
                | StrategyError::Suggestion(_) => (StatusCode::BAD_GATEWAY, "upstream_failed"),
                StrategyError::HomeNotFound
                | StrategyError::Io(_)
                | StrategyError::Yaml(_)
                | StrategyError::Json(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            }
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        };

        if status.is_server_error() {
            tracing::error!(error = %format!("{:#}", self.0), "request failed");
        }
        let body = serde_json::json!({ "error": code, "message": format!("{:#}", self.0) });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
