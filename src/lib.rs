//! # FlowLine
//!
//! FlowLine Prototype - a single-page map dashboard with an optional
//! Firestore connectivity check.
//!
//! ## Features
//!
//! - **Fixed map view**: San Francisco at zoom 13 on OpenStreetMap tiles
//! - **Fail-open backend**: one memoized Firestore connection attempt per
//!   process; failures become a status message, never an error page
//! - **Two page variants**: informational (sidebar note) or connected
//!   (status line), selected by one flag
//!
//! ## Modules
//!
//! - [`map`]: Map view constants and sizing
//! - [`connector`]: Memoized Firestore connector and credential resolution
//! - [`dashboard`]: Page model and HTML rendering
//! - [`server`]: HTTP server with Axum
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowline::{AmbientEnv, Dashboard, DashboardOptions, FirestoreConfig, FirestoreConnector, ServiceConnector};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = FirestoreConnector::new(FirestoreConfig::default(), AmbientEnv::capture())?;
//!     let connector = Arc::new(ServiceConnector::new(Arc::new(backend)));
//!
//!     let dashboard = Dashboard::new(DashboardOptions::connected(), Some(connector));
//!     let page = dashboard.render_page().await;
//!
//!     println!("{}", page.status_text().unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connector;
pub mod dashboard;
pub mod map;
pub mod server;
pub mod telemetry;

pub use config::{
    generate_default_config, Config, ConfigError, ConfigLoad, DashboardSettings, FirestoreConfig,
    LoggingConfig, ServerConfig,
};

pub use connector::{
    AmbientEnv, Connect, ConnectionOutcome, ConnectorError, CredentialError, FirestoreConnector,
    FirestoreHandle, HandleLookup, Notice, ServiceConnector, ServiceHandle,
};

pub use dashboard::{Dashboard, DashboardOptions, Layout, Page, PageConfig};

pub use map::{LatLng, MapSize, MapView, TileSource};

pub use server::{build_router, serve, AppState, ServerError};
