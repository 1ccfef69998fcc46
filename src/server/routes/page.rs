//! Page Routes
//!
//! - GET / - The dashboard

use axum::{extract::State, response::Html};
use std::sync::Arc;

use crate::server::state::AppState;

/// GET /
///
/// Render the dashboard. The first request with the connectivity check
/// enabled blocks on the connection attempt.
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let page = state.dashboard.render_page().await;
    tracing::debug!(
        blocks = page.blocks.len(),
        status = page.status_text().unwrap_or("none"),
        "Rendered dashboard"
    );
    Html(page.to_html())
}
