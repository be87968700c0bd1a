pub mod ai;
pub mod config;
pub mod docstore;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health))
        // Projects
        .route("/projects/{user_id}", get(routes::projects::list_projects))
        .route("/projects/{user_id}", post(routes::projects::save_project))
        .route(
            "/projects/{user_id}/{project_id}",
            delete(routes::projects::delete_project),
        )
        // Suggestions
        .route("/suggestions", post(routes::suggestions::suggest))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the proxy server on `config.port`.
pub async fn serve(config: config::ServerConfig) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(config, listener).await
}

/// Start the proxy server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(
    config: config::ServerConfig,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(state::AppState::from_config(&config)?);

    tracing::info!("StrategySuite server listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
