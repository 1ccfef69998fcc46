//! Application Default Credentials
//!
//! Resolves the ambient Google credentials the same way the Firebase Admin
//! SDK's default initialization does, reading from an explicit
//! [`AmbientEnv`] snapshot instead of the live process environment.
//!
//! Resolution order:
//! 1. `FIRESTORE_EMULATOR_HOST` (no token needed)
//! 2. An explicit key file path, or `GOOGLE_APPLICATION_CREDENTIALS`
//! 3. The gcloud well-known file
//! 4. The GCE metadata server

use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const EMULATOR_HOST_ENV: &str = "FIRESTORE_EMULATOR_HOST";
pub const CREDENTIALS_FILE_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const METADATA_HOST: &str = "metadata.google.internal";

/// Snapshot of the environment that credential resolution depends on
#[derive(Debug, Clone, Default)]
pub struct AmbientEnv {
    /// Firestore emulator `host:port`
    pub emulator_host: Option<String>,
    /// Key file named by `GOOGLE_APPLICATION_CREDENTIALS`
    pub credentials_file: Option<PathBuf>,
    /// Project named by `GOOGLE_CLOUD_PROJECT`
    pub project_id: Option<String>,
    /// gcloud's `application_default_credentials.json`
    pub well_known_file: Option<PathBuf>,
    /// Metadata server host; `None` disables the metadata fallback
    pub metadata_host: Option<String>,
}

impl AmbientEnv {
    /// Capture the current process environment
    pub fn capture() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            emulator_host: non_empty(EMULATOR_HOST_ENV),
            credentials_file: non_empty(CREDENTIALS_FILE_ENV).map(PathBuf::from),
            project_id: non_empty(PROJECT_ENV),
            well_known_file: dirs::config_dir()
                .map(|p| p.join("gcloud").join("application_default_credentials.json")),
            metadata_host: Some(METADATA_HOST.to_string()),
        }
    }
}

/// Contents of a credential key file
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialFile {
    /// Written by `gcloud auth application-default login`
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        #[serde(default)]
        quota_project_id: Option<String>,
    },
    /// Service account key downloaded from the console
    ServiceAccount {
        #[serde(default)]
        project_id: Option<String>,
        client_email: String,
    },
}

impl CredentialFile {
    /// Read and parse a key file
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let content = std::fs::read_to_string(path).map_err(|e| CredentialError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| CredentialError::Malformed {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Project id recorded in the file, if any
    pub fn project_hint(&self) -> Option<&str> {
        match self {
            CredentialFile::AuthorizedUser {
                quota_project_id, ..
            } => quota_project_id.as_deref(),
            CredentialFile::ServiceAccount { project_id, .. } => project_id.as_deref(),
        }
    }
}

/// Where the credentials came from
#[derive(Debug, Clone)]
pub enum CredentialSource {
    Emulator { host: String },
    File { path: PathBuf, key: CredentialFile },
    MetadataServer { host: String },
}

impl CredentialSource {
    /// Resolve the ambient credential source
    ///
    /// `explicit` takes precedence over `GOOGLE_APPLICATION_CREDENTIALS`.
    pub fn resolve(env: &AmbientEnv, explicit: Option<&Path>) -> Result<Self, CredentialError> {
        if let Some(host) = &env.emulator_host {
            return Ok(CredentialSource::Emulator { host: host.clone() });
        }

        if let Some(path) = explicit.or(env.credentials_file.as_deref()) {
            let key = CredentialFile::load(path)?;
            return Ok(CredentialSource::File {
                path: path.to_path_buf(),
                key,
            });
        }

        if let Some(path) = env.well_known_file.as_deref().filter(|p| p.exists()) {
            let key = CredentialFile::load(path)?;
            return Ok(CredentialSource::File {
                path: path.to_path_buf(),
                key,
            });
        }

        if let Some(host) = &env.metadata_host {
            return Ok(CredentialSource::MetadataServer { host: host.clone() });
        }

        Err(CredentialError::NotFound(
            "no emulator, key file, or metadata server configured".to_string(),
        ))
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            CredentialSource::Emulator { host } => format!("emulator at {}", host),
            CredentialSource::File { path, .. } => format!("key file {}", path.display()),
            CredentialSource::MetadataServer { host } => format!("metadata server {}", host),
        }
    }

    /// Project id implied by the credentials themselves
    pub fn project_hint(&self) -> Option<&str> {
        match self {
            CredentialSource::File { key, .. } => key.project_hint(),
            _ => None,
        }
    }

    /// Exchange the credentials for an access token
    ///
    /// The emulator needs no token and yields `None`.
    pub async fn fetch_token(&self, http: &Client) -> Result<Option<AccessToken>, CredentialError> {
        match self {
            CredentialSource::Emulator { .. } => Ok(None),
            CredentialSource::File {
                key:
                    CredentialFile::AuthorizedUser {
                        client_id,
                        client_secret,
                        refresh_token,
                        ..
                    },
                ..
            } => {
                let params = [
                    ("grant_type", "refresh_token"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                ];
                let response = http.post(TOKEN_URL).form(&params).send().await?;
                read_token(response).await.map(Some)
            }
            CredentialSource::File {
                key: CredentialFile::ServiceAccount { client_email, .. },
                ..
            } => Err(CredentialError::Unsupported(format!(
                "service account key for {} requires JWT signing; use `gcloud auth application-default login` or the metadata server",
                client_email
            ))),
            CredentialSource::MetadataServer { host } => {
                let url = format!(
                    "http://{}/computeMetadata/v1/instance/service-account/default/token",
                    host
                );
                let response = http
                    .get(&url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?;
                read_token(response).await.map(Some)
            }
        }
    }

    /// Ask the metadata server which project this instance belongs to
    pub async fn metadata_project(&self, http: &Client) -> Result<Option<String>, CredentialError> {
        let CredentialSource::MetadataServer { host } = self else {
            return Ok(None);
        };

        let url = format!("http://{}/computeMetadata/v1/project/project-id", host);
        let response = http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let project = response.text().await?;
        let project = project.trim();
        Ok((!project.is_empty()).then(|| project.to_string()))
    }
}

/// A bearer token for Google APIs
///
/// The handle lives as long as the process and is never refreshed, so the
/// token's lifetime is not tracked.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

async fn read_token(response: reqwest::Response) -> Result<AccessToken, CredentialError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(CredentialError::TokenExchange {
            status: status.as_u16(),
            message,
        });
    }

    let token: TokenResponse = response.json().await?;
    Ok(AccessToken {
        value: token.access_token,
    })
}

/// Errors from credential resolution
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("no default credentials found: {0}")]
    NotFound(String),

    #[error("failed to read credentials {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("malformed credentials {path:?}: {error}")]
    Malformed { path: PathBuf, error: String },

    #[error("unsupported credentials: {0}")]
    Unsupported(String),

    #[error("token exchange failed ({status}): {message}")]
    TokenExchange { status: u16, message: String },

    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("no project id could be determined")]
    MissingProject,
}
