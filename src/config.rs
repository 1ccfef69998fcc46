//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dashboard::Layout;
use crate::map::MapSize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub dashboard: DashboardSettings,

    #[serde(default)]
    pub firestore: FirestoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8501
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Dashboard page options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardSettings {
    /// Attempt the Firestore connection and show its status
    #[serde(default)]
    pub connectivity_check: bool,

    /// Map width in px; absent means the variant default
    pub map_width: Option<u32>,

    /// Map height in px; absent means the variant default
    pub map_height: Option<u32>,

    /// Render the map at full width even when the variant is fixed-size
    #[serde(default)]
    pub fluid_width: bool,

    /// Page width: `wide` or `centered`
    #[serde(default)]
    pub layout: Layout,
}

impl DashboardSettings {
    /// Map size after applying overrides to the variant's default
    pub fn map_size(&self, variant_default: MapSize) -> MapSize {
        let width = if self.fluid_width {
            None
        } else {
            self.map_width.or(variant_default.width)
        };

        MapSize {
            width,
            height: self.map_height.unwrap_or(variant_default.height),
        }
    }
}

/// Firestore connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FirestoreConfig {
    /// Project id; falls back to the ambient credentials
    pub project_id: Option<String>,

    #[serde(default = "default_database")]
    pub database: String,

    /// Key file used instead of `GOOGLE_APPLICATION_CREDENTIALS`
    pub credentials_path: Option<PathBuf>,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_verify_connection")]
    pub verify_connection: bool,
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_endpoint() -> String {
    "https://firestore.googleapis.com".to_string()
}

fn default_verify_connection() -> bool {
    true
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            database: default_database(),
            credentials_path: None,
            endpoint: default_endpoint(),
            verify_connection: default_verify_connection(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    ///
    /// Runs before logging is set up, so nothing is logged here; the caller
    /// reports [`ConfigLoad::source`] and [`ConfigLoad::errors`] afterwards.
    pub fn load_default() -> ConfigLoad {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("flowline").join("config.toml")),
            Some(PathBuf::from("/etc/flowline/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    /// Load the first existing path that parses, collecting failures on the way
    fn load_first(paths: &[PathBuf]) -> ConfigLoad {
        let mut errors = Vec::new();

        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_with_env(path) {
                Ok(config) => {
                    return ConfigLoad {
                        config,
                        source: Some(path.clone()),
                        errors,
                    }
                }
                Err(e) => errors.push(e),
            }
        }

        ConfigLoad {
            config: Self::from_env(),
            source: None,
            errors,
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(host) = var("FLOWLINE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("FLOWLINE_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Dashboard overrides
        if let Some(flag) = var("FLOWLINE_CONNECTIVITY_CHECK").and_then(|v| parse_flag(&v)) {
            self.dashboard.connectivity_check = flag;
        }

        // Firestore overrides
        if let Some(project) = var("FLOWLINE_FIRESTORE_PROJECT") {
            self.firestore.project_id = Some(project);
        }
        if let Some(database) = var("FLOWLINE_FIRESTORE_DATABASE") {
            self.firestore.database = database;
        }

        // Logging overrides
        if let Some(level) = var("FLOWLINE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("FLOWLINE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Boolean env value; unrecognized values yield `None` and are ignored
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Result of searching the default config locations
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    /// File the config came from; `None` means defaults plus env
    pub source: Option<PathBuf>,
    /// Files that existed but failed to load
    pub errors: Vec<ConfigError>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# FlowLine Configuration
#
# Environment variables override these settings:
# - FLOWLINE_HOST
# - FLOWLINE_PORT
# - FLOWLINE_CONNECTIVITY_CHECK
# - FLOWLINE_FIRESTORE_PROJECT
# - FLOWLINE_FIRESTORE_DATABASE
# - FLOWLINE_LOG_LEVEL
# - FLOWLINE_LOG_FORMAT
#
# Credentials come from the usual Google sources:
# FIRESTORE_EMULATOR_HOST, GOOGLE_APPLICATION_CREDENTIALS,
# the gcloud application-default file, or the metadata server.

[server]
# Host to bind to
host = "0.0.0.0"

# Port to listen on
port = 8501

[dashboard]
# Attempt the Firestore connection and show its status on the page
connectivity_check = false

# Map size in pixels. Leave unset for the page variant's default
# (full width x 600 without the check, 700 x 500 with it).
# map_width = 700
# map_height = 500

# Force full-width map regardless of map_width
fluid_width = false

# Page layout: wide or centered
layout = "wide"

[firestore]
# Project id (default: taken from the credentials)
# project_id = "my-project"

# Database id
database = "(default)"

# Key file used instead of GOOGLE_APPLICATION_CREDENTIALS
# credentials_path = "/path/to/application_default_credentials.json"

# Firestore REST endpoint
endpoint = "https://firestore.googleapis.com"

# List one page of documents after authenticating
verify_connection = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
