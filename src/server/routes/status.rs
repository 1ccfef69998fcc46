//! Status Routes
//!
//! - GET /api/v1/status - Connector state
//!
//! Reading the status never triggers the connection attempt.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::server::dto::{ConnectionState, StatusResponse};
use crate::server::state::AppState;

/// GET /api/v1/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(current_status(&state))
}

/// Snapshot of the connector slot
pub fn current_status(state: &AppState) -> StatusResponse {
    if !state.connectivity_check() {
        return StatusResponse::bare(ConnectionState::Disabled);
    }

    let Some(connector) = &state.connector else {
        return StatusResponse::bare(ConnectionState::Disabled);
    };

    match connector.peek() {
        Some(outcome) => StatusResponse::from_outcome(
            outcome,
            connector.completed_at().map(|at| at.to_rfc3339()),
        ),
        None => StatusResponse::bare(ConnectionState::Pending),
    }
}
