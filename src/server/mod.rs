//! FlowLine HTTP Server
//!
//! Serves the dashboard page and a small JSON surface, built with Axum.
//!
//! # Endpoints
//!
//! ## Page
//! - `GET /` - The dashboard
//!
//! ## API
//! - `GET /api/v1/map` - Map view parameters
//! - `GET /api/v1/status` - Connector state
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::ServerError;
pub use state::AppState;

use axum::{http::Uri, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/map", get(routes::map::get_map))
        .route("/status", get(routes::status::get_status));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .route("/", get(routes::page::index))
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

async fn not_found(uri: Uri) -> ServerError {
    ServerError::NotFound(uri.path().to_string())
}

/// Start the server
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<(), ServerError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("FlowLine listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("FlowLine shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
