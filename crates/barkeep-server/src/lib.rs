pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use barkeep_core::Dispatcher;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(config_path: PathBuf, dispatcher: Dispatcher) -> Router {
    let app_state = state::AppState::new(config_path, dispatcher);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Jobs
        .route("/api/orders", post(routes::orders::submit_order))
        .route("/api/manual", post(routes::manual::submit_manual))
        .route("/api/manual/all", post(routes::manual::submit_pump_test))
        // Read-only views
        .route("/api/status", get(routes::status::get_status))
        .route("/api/calibration", get(routes::calibration::get_calibration))
        .route("/api/menu", get(routes::menu::get_menu))
        // Liveness
        .route("/api/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Serve the API on a pre-bound listener until the future is dropped.
///
/// Taking a bound `TcpListener` lets the caller read the actual port first
/// (useful when `port = 0` and the OS picks a free port).
pub async fn serve_on(
    config_path: PathBuf,
    dispatcher: Dispatcher,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_router(config_path, dispatcher);

    tracing::info!(%addr, "barkeep API listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
