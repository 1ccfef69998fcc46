//! Logging setup
//!
//! `RUST_LOG` wins when set; otherwise the `[logging]` level applies to the
//! flowline and tower_http targets. Output goes to stderr so `flowline render`
//! can write the page to stdout.

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global tracing subscriber
pub fn init(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(config))
            .map_err(|e| TelemetryError::InvalidFilter(e.to_string()))?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.format.eq_ignore_ascii_case("json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| TelemetryError::Init(e.to_string()))
}

fn default_directive(config: &LoggingConfig) -> String {
    format!("flowline={level},tower_http={level}", level = config.level)
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("failed to install subscriber: {0}")]
    Init(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            ..Default::default()
        };
        assert_eq!(default_directive(&config), "flowline=debug,tower_http=debug");
        assert!(EnvFilter::try_new(default_directive(&config)).is_ok());
    }
}
