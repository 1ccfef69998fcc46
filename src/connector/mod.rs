//! Service Connector
//!
//! Obtains a Firestore handle at most once per process and caches the
//! outcome, good or bad, for every later caller.
//!
//! ## Architecture
//!
//! - **Connect**: the seam that performs one connection attempt
//! - **FirestoreConnector**: the real backend (ADC credentials + one REST check)
//! - **ServiceConnector**: the memoizing wrapper handed to the dashboard
//!
//! ## Lifecycle
//!
//! 1. The slot starts empty ("not yet attempted")
//! 2. The first `get_service_handle()` starts the attempt on its own task;
//!    every caller, including later ones, waits on that same attempt
//! 3. The outcome (`Connected` or `Unavailable`) is terminal for the process
//!
//! The attempt is detached from the caller, so a caller dropped mid-attempt
//! (a closed browser tab) does not cause a second attempt. Failures never
//! escape: they become an `Unavailable` outcome plus a single warning notice
//! delivered to the first caller that sees the finished attempt.

mod credentials;
mod firestore;

pub use credentials::{AccessToken, AmbientEnv, CredentialError, CredentialFile, CredentialSource};
pub use firestore::{FirestoreConnector, FirestoreHandle};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Status line shown when the handle is live
pub const CONNECTED_MESSAGE: &str = "Connected to Firebase";

/// Status line shown when running without a handle
pub const DEGRADED_MESSAGE: &str = "Running in demo mode without Firebase credentials";

/// A connected Firestore client, shared by every caller
pub type ServiceHandle = Arc<FirestoreHandle>;

/// Performs a single connection attempt
#[async_trait]
pub trait Connect: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Resolve credentials and connect
    async fn connect(&self) -> Result<FirestoreHandle, ConnectorError>;
}

/// Terminal result of the connection attempt
#[derive(Debug, Clone)]
pub enum ConnectionOutcome {
    Connected(ServiceHandle),
    Unavailable { reason: String },
}

impl ConnectionOutcome {
    /// The handle, if connected
    pub fn handle(&self) -> Option<&ServiceHandle> {
        match self {
            ConnectionOutcome::Connected(handle) => Some(handle),
            ConnectionOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionOutcome::Connected(_))
    }

    /// Status line text for the dashboard
    pub fn status_message(&self) -> &'static str {
        match self {
            ConnectionOutcome::Connected(_) => CONNECTED_MESSAGE,
            ConnectionOutcome::Unavailable { .. } => DEGRADED_MESSAGE,
        }
    }
}

/// A user-facing message produced by the connection attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "text", rename_all = "snake_case")]
pub enum Notice {
    Info(String),
    Warning(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(text) | Notice::Warning(text) => text,
        }
    }
}

/// What a caller of [`ServiceConnector::get_service_handle`] receives
#[derive(Debug, Clone)]
pub struct HandleLookup {
    pub outcome: ConnectionOutcome,
    /// Non-empty only for the first caller to see the finished attempt
    pub notices: Vec<Notice>,
}

#[derive(Debug)]
struct Attempt {
    outcome: ConnectionOutcome,
    notices: Vec<Notice>,
    completed_at: DateTime<Utc>,
}

impl Attempt {
    fn connected(handle: FirestoreHandle) -> Self {
        let info = if handle.is_emulator() {
            format!("Using Firestore emulator project {}", handle.project_id())
        } else {
            format!(
                "Using Firestore project {} (database {})",
                handle.project_id(),
                handle.database()
            )
        };

        Self {
            outcome: ConnectionOutcome::Connected(Arc::new(handle)),
            notices: vec![Notice::Info(info)],
            completed_at: Utc::now(),
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            notices: vec![Notice::Warning(format!(
                "Firebase initialization failed: {}",
                reason
            ))],
            outcome: ConnectionOutcome::Unavailable { reason },
            completed_at: Utc::now(),
        }
    }
}

/// Memoizing wrapper around a [`Connect`] backend
pub struct ServiceConnector {
    backend: Arc<dyn Connect>,
    slot: Arc<OnceCell<Attempt>>,
    notified: AtomicBool,
}

impl ServiceConnector {
    /// Create a connector with an empty slot
    pub fn new(backend: Arc<dyn Connect>) -> Self {
        Self {
            backend,
            slot: Arc::new(OnceCell::new()),
            notified: AtomicBool::new(false),
        }
    }

    /// Create a connector whose slot is already initialized
    ///
    /// No attempt is ever made and no notices are emitted.
    pub fn with_outcome(backend: Arc<dyn Connect>, outcome: ConnectionOutcome) -> Self {
        Self {
            backend,
            slot: Arc::new(OnceCell::new_with(Some(Attempt {
                outcome,
                notices: Vec::new(),
                completed_at: Utc::now(),
            }))),
            notified: AtomicBool::new(true),
        }
    }

    /// Return the cached outcome, running the attempt on first use
    pub async fn get_service_handle(&self) -> HandleLookup {
        let attempt = match self.slot.get() {
            Some(attempt) => attempt,
            None => self.wait_for_attempt().await,
        };

        let notices = if self.notified.swap(true, Ordering::AcqRel) {
            tracing::debug!(backend = self.backend.name(), "Using cached service outcome");
            Vec::new()
        } else {
            attempt.notices.clone()
        };

        HandleLookup {
            outcome: attempt.outcome.clone(),
            notices,
        }
    }

    /// The cached outcome without triggering an attempt
    pub fn peek(&self) -> Option<&ConnectionOutcome> {
        self.slot.get().map(|attempt| &attempt.outcome)
    }

    /// When the attempt finished, if it has run
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.slot.get().map(|attempt| attempt.completed_at)
    }

    /// Initialize the slot from a spawned task
    ///
    /// The task owns the initializer, so dropping this future leaves the
    /// attempt running and later callers wait on it instead of starting
    /// their own.
    async fn wait_for_attempt(&self) -> &Attempt {
        let slot = Arc::clone(&self.slot);
        let backend = Arc::clone(&self.backend);
        let task = tokio::spawn(async move {
            slot.get_or_init(|| run_attempt(backend)).await;
        });

        if let Err(e) = task.await {
            tracing::error!(
                backend = self.backend.name(),
                error = %e,
                "Service connection attempt aborted"
            );
            let reason = format!("connection attempt aborted: {}", e);
            return self
                .slot
                .get_or_init(|| async move { Attempt::failed(reason) })
                .await;
        }

        self.slot
            .get_or_init(|| async { Attempt::failed("connection attempt did not finish".to_string()) })
            .await
    }
}

async fn run_attempt(backend: Arc<dyn Connect>) -> Attempt {
    tracing::info!(backend = backend.name(), "Initializing service connection");

    match backend.connect().await {
        Ok(handle) => {
            tracing::info!(
                backend = backend.name(),
                project_id = %handle.project_id(),
                database = %handle.database(),
                emulator = handle.is_emulator(),
                "Service connection established"
            );
            Attempt::connected(handle)
        }
        Err(e) => {
            tracing::warn!(
                backend = backend.name(),
                error = %e,
                "Service unavailable, continuing without connection"
            );
            Attempt::failed(e.to_string())
        }
    }
}

/// Errors from a connection attempt
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("credential resolution failed: {0}")]
    Credentials(#[from] CredentialError),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("service rejected connection ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use axum::{
        http::{header::USER_AGENT, HeaderMap, StatusCode},
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use std::sync::atomic::AtomicUsize;

    /// Backend that counts attempts and returns a canned result
    pub struct FakeConnector {
        pub attempts: AtomicUsize,
        fail_with: Option<String>,
    }

    impl FakeConnector {
        pub fn succeeding() -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                fail_with: None,
            }
        }

        pub fn failing(reason: &str) -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                fail_with: Some(reason.to_string()),
            }
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connect for FakeConnector {
        fn name(&self) -> &str {
            "fake"
        }

        async fn connect(&self) -> Result<FirestoreHandle, ConnectorError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            match &self.fail_with {
                Some(reason) => Err(ConnectorError::Credentials(CredentialError::NotFound(
                    reason.clone(),
                ))),
                None => Ok(FirestoreHandle::emulator(
                    reqwest::Client::new(),
                    "localhost:8080",
                    "demo-flowline",
                    "(default)",
                )),
            }
        }
    }

    pub const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-account/default/token";

    /// Local stand-in for the Google token and Firestore endpoints
    ///
    /// The metadata token path answers with `token_status`; every other path
    /// answers with `documents_status`, or 400 when the request lacks the
    /// flowline user agent. Returns the `host:port` it listens on.
    pub async fn stub_server(token_status: StatusCode, documents_status: StatusCode) -> String {
        let router = Router::new()
            .route(
                METADATA_TOKEN_PATH,
                get(move || async move {
                    if token_status.is_success() {
                        (
                            token_status,
                            Json(serde_json::json!({
                                "access_token": "ya29.stub",
                                "expires_in": i64::MAX,
                                "token_type": "Bearer",
                            })),
                        )
                            .into_response()
                    } else {
                        (token_status, "invalid_grant").into_response()
                    }
                }),
            )
            .fallback(move |headers: HeaderMap| async move {
                let from_flowline = headers
                    .get(USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v.starts_with("flowline/"));
                if !from_flowline {
                    return (StatusCode::BAD_REQUEST, "missing user agent");
                }
                (documents_status, "stub documents")
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        addr.to_string()
    }
}
