//! Data Transfer Objects
//!
//! Response types for the JSON endpoints.

use serde::Serialize;

use crate::connector::ConnectionOutcome;
use crate::map::{MapSize, MapView};

/// Map endpoint response
#[derive(Debug, Serialize)]
pub struct MapResponse {
    pub view: MapView,
    pub size: MapSize,
}

/// State of the connector slot as reported over HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Pages do not run the connectivity check
    Disabled,
    /// No page has triggered the attempt yet
    Pending,
    Connected,
    Unavailable,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disabled => "disabled",
            ConnectionState::Pending => "pending",
            ConnectionState::Connected => "connected",
            ConnectionState::Unavailable => "unavailable",
        }
    }
}

/// Status endpoint response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: ConnectionState,
    /// Status line text, once the attempt has run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure reason when unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emulator: Option<bool>,
    /// When the attempt finished (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<String>,
}

impl StatusResponse {
    /// Response for a state with no attempt details
    pub fn bare(state: ConnectionState) -> Self {
        Self {
            state,
            message: None,
            reason: None,
            project_id: None,
            database: None,
            emulator: None,
            checked_at: None,
        }
    }

    /// Response describing a finished attempt
    pub fn from_outcome(outcome: &ConnectionOutcome, checked_at: Option<String>) -> Self {
        let mut response = match outcome {
            ConnectionOutcome::Connected(handle) => Self {
                project_id: Some(handle.project_id().to_string()),
                database: Some(handle.database().to_string()),
                emulator: Some(handle.is_emulator()),
                ..Self::bare(ConnectionState::Connected)
            },
            ConnectionOutcome::Unavailable { reason } => Self {
                reason: Some(reason.clone()),
                ..Self::bare(ConnectionState::Unavailable)
            },
        };
        response.message = Some(outcome.status_message().to_string());
        response.checked_at = checked_at;
        response
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy or degraded
    pub status: String,
    /// Connector state
    pub service: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
