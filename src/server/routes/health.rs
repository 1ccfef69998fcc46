//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (ready to serve traffic)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::server::dto::{ConnectionState, HealthResponse};
use crate::server::routes::status::current_status;
use crate::server::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// The page renders with or without the backend, so the server is ready
/// as soon as it accepts connections.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
///
/// Full health status. An unavailable backend reports "degraded".
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let service = current_status(&state).state;

    let status = match service {
        ConnectionState::Unavailable => "degraded",
        _ => "healthy",
    };

    Json(HealthResponse {
        status: status.to_string(),
        service: service.as_str().to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
