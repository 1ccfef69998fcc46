//! Map Routes
//!
//! - GET /api/v1/map - Map view parameters

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::map::MapView;
use crate::server::dto::MapResponse;
use crate::server::state::AppState;

/// GET /api/v1/map
pub async fn get_map(State(state): State<Arc<AppState>>) -> Json<MapResponse> {
    Json(MapResponse {
        view: MapView::fixed(),
        size: state.dashboard.options().map_size,
    })
}
