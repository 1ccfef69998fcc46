//! Application State
//!
//! Shared state accessible by all HTTP handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::connector::ServiceConnector;
use crate::dashboard::{Dashboard, DashboardOptions};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Page renderer
    pub dashboard: Arc<Dashboard>,
    /// Memoized Firestore connector, shared with the dashboard
    pub connector: Option<Arc<ServiceConnector>>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create state for the informational page, without a connector
    pub fn new(options: DashboardOptions) -> Self {
        Self {
            dashboard: Arc::new(Dashboard::new(options, None)),
            connector: None,
            start_time: Instant::now(),
        }
    }

    /// Create state with a connector wired into the dashboard
    pub fn with_connector(options: DashboardOptions, connector: Arc<ServiceConnector>) -> Self {
        Self {
            dashboard: Arc::new(Dashboard::new(options, Some(Arc::clone(&connector)))),
            connector: Some(connector),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Whether pages run the connectivity check
    pub fn connectivity_check(&self) -> bool {
        self.dashboard.options().connectivity_check
    }
}
