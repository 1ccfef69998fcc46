//! Firestore REST Connector
//!
//! Real [`Connect`] backend: resolves credentials, picks a project and
//! lists one page of the documents endpoint to verify access.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::credentials::{AccessToken, AmbientEnv, CredentialError, CredentialSource};
use super::{Connect, ConnectorError};
use crate::config::FirestoreConfig;

/// Project used against the emulator when nothing else names one
pub const EMULATOR_PROJECT: &str = "demo-flowline";

/// A connected Firestore client
#[derive(Debug, Clone)]
pub struct FirestoreHandle {
    http: Client,
    base_url: String,
    project_id: String,
    database: String,
    token: Option<AccessToken>,
    emulator: bool,
}

impl FirestoreHandle {
    /// Handle against the production endpoint
    pub fn new(
        http: Client,
        endpoint: &str,
        project_id: impl Into<String>,
        database: impl Into<String>,
        token: AccessToken,
    ) -> Self {
        Self {
            http,
            base_url: format!("{}/v1", endpoint.trim_end_matches('/')),
            project_id: project_id.into(),
            database: database.into(),
            token: Some(token),
            emulator: false,
        }
    }

    /// Handle against a local emulator; no token is sent
    pub fn emulator(
        http: Client,
        host: &str,
        project_id: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: format!("http://{}/v1", host),
            project_id: project_id.into(),
            database: database.into(),
            token: None,
            emulator: true,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn is_emulator(&self) -> bool {
        self.emulator
    }

    /// Resource URL of the database's document root
    pub fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents",
            self.base_url, self.project_id, self.database
        )
    }

    /// Confirm the database answers with our credentials
    ///
    /// Lists at most one document and discards the body.
    pub async fn verify(&self) -> Result<(), ConnectorError> {
        let mut request = self
            .http
            .get(self.documents_url())
            .query(&[("pageSize", "1")]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(&token.value);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ConnectorError::PermissionDenied(message))
            }
            _ => Err(ConnectorError::Rejected {
                status: status.as_u16(),
                message,
            }),
        }
    }
}

/// Connects to Firestore with Application Default Credentials
pub struct FirestoreConnector {
    http: Client,
    config: FirestoreConfig,
    env: AmbientEnv,
}

impl FirestoreConnector {
    pub fn new(config: FirestoreConfig, env: AmbientEnv) -> Result<Self, ConnectorError> {
        Ok(Self {
            http: http_client()?,
            config,
            env,
        })
    }

    /// Pick the project: config, then environment, then credentials
    async fn resolve_project(&self, source: &CredentialSource) -> Result<String, ConnectorError> {
        if let Some(project) = self
            .config
            .project_id
            .clone()
            .or_else(|| self.env.project_id.clone())
            .or_else(|| source.project_hint().map(str::to_string))
        {
            return Ok(project);
        }

        if let CredentialSource::Emulator { .. } = source {
            return Ok(EMULATOR_PROJECT.to_string());
        }

        source
            .metadata_project(&self.http)
            .await?
            .ok_or(ConnectorError::Credentials(CredentialError::MissingProject))
    }
}

#[async_trait]
impl Connect for FirestoreConnector {
    fn name(&self) -> &str {
        "firestore"
    }

    async fn connect(&self) -> Result<FirestoreHandle, ConnectorError> {
        let source =
            CredentialSource::resolve(&self.env, self.config.credentials_path.as_deref())?;
        tracing::debug!(source = %source.describe(), "Resolved default credentials");

        let token = source.fetch_token(&self.http).await?;
        let project_id = self.resolve_project(&source).await?;
        validate_identifier(&project_id)?;
        validate_identifier(&self.config.database)?;

        let handle = match (&source, token) {
            (CredentialSource::Emulator { host }, _) => FirestoreHandle::emulator(
                self.http.clone(),
                host,
                project_id,
                self.config.database.clone(),
            ),
            (_, Some(token)) => FirestoreHandle::new(
                self.http.clone(),
                &self.config.endpoint,
                project_id,
                self.config.database.clone(),
                token,
            ),
            (_, None) => {
                return Err(ConnectorError::Credentials(CredentialError::NotFound(
                    "credential source produced no access token".to_string(),
                )))
            }
        };

        if self.config.verify_connection {
            handle.verify().await?;
        } else {
            tracing::debug!("Skipping connection check");
        }

        Ok(handle)
    }
}

/// HTTP client shared by token requests and Firestore calls
pub(crate) fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("flowline/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Project and database ids go into the URL path unescaped
fn validate_identifier(id: &str) -> Result<(), ConnectorError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '(' | ')' | '.' | ':'));

    if valid {
        Ok(())
    } else {
        Err(ConnectorError::InvalidIdentifier(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::testing::stub_server;
    use crate::connector::{ConnectionOutcome, ServiceConnector, DEGRADED_MESSAGE};
    use crate::dashboard::{Dashboard, DashboardOptions};
    use axum::http::StatusCode as StubStatus;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn config() -> FirestoreConfig {
        FirestoreConfig {
            verify_connection: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_documents_url() {
        let handle = FirestoreHandle::emulator(
            Client::new(),
            "localhost:8080",
            "demo-flowline",
            "(default)",
        );
        assert_eq!(
            handle.documents_url(),
            "http://localhost:8080/v1/projects/demo-flowline/databases/(default)/documents"
        );
        assert!(handle.is_emulator());
    }

    #[test]
    fn test_production_url() {
        let token = AccessToken {
            value: "ya29.token".to_string(),
        };
        let handle = FirestoreHandle::new(
            Client::new(),
            "https://firestore.googleapis.com/",
            "flowline-prod",
            "(default)",
            token,
        );
        assert_eq!(
            handle.documents_url(),
            "https://firestore.googleapis.com/v1/projects/flowline-prod/databases/(default)/documents"
        );
        assert!(!handle.is_emulator());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("flowline-prod").is_ok());
        assert!(validate_identifier("(default)").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("a/b").is_err());
        assert!(validate_identifier("a b").is_err());
    }

    #[tokio::test]
    async fn test_emulator_connect_unverified() {
        let env = AmbientEnv {
            emulator_host: Some("localhost:8080".to_string()),
            ..Default::default()
        };
        let connector = FirestoreConnector::new(config(), env).unwrap();

        let handle = connector.connect().await.unwrap();
        assert_eq!(handle.project_id(), EMULATOR_PROJECT);
        assert_eq!(handle.database(), "(default)");
    }

    #[tokio::test]
    async fn test_config_project_wins() {
        let env = AmbientEnv {
            emulator_host: Some("localhost:8080".to_string()),
            project_id: Some("from-env".to_string()),
            ..Default::default()
        };
        let connector = FirestoreConnector::new(
            FirestoreConfig {
                project_id: Some("from-config".to_string()),
                ..config()
            },
            env,
        )
        .unwrap();

        let handle = connector.connect().await.unwrap();
        assert_eq!(handle.project_id(), "from-config");
    }

    #[tokio::test]
    async fn test_missing_credentials_fail() {
        let connector = FirestoreConnector::new(config(), AmbientEnv::default()).unwrap();

        let err = connector.connect().await.unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::Credentials(CredentialError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_file_fails() {
        let connector = FirestoreConnector::new(
            FirestoreConfig {
                credentials_path: Some(PathBuf::from("/nonexistent/key.json")),
                ..config()
            },
            AmbientEnv::default(),
        )
        .unwrap();

        let err = connector.connect().await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/key.json"));
    }

    fn stub_handle(host: &str) -> FirestoreHandle {
        FirestoreHandle::new(
            http_client().unwrap(),
            &format!("http://{}", host),
            "flowline-test",
            "(default)",
            AccessToken {
                value: "ya29.stub".to_string(),
            },
        )
    }

    /// Production-style connector that gets its token from the stub
    fn metadata_connector(host: &str) -> FirestoreConnector {
        let env = AmbientEnv {
            metadata_host: Some(host.to_string()),
            ..Default::default()
        };
        FirestoreConnector::new(
            FirestoreConfig {
                project_id: Some("flowline-test".to_string()),
                endpoint: format!("http://{}", host),
                verify_connection: true,
                ..Default::default()
            },
            env,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_documents_request_status_mapping() {
        let ok = stub_server(StubStatus::OK, StubStatus::OK).await;
        assert!(stub_handle(&ok).verify().await.is_ok());

        let forbidden = stub_server(StubStatus::OK, StubStatus::FORBIDDEN).await;
        let err = stub_handle(&forbidden).verify().await.unwrap_err();
        assert!(matches!(err, ConnectorError::PermissionDenied(_)));

        let failing = stub_server(StubStatus::OK, StubStatus::INTERNAL_SERVER_ERROR).await;
        let err = stub_handle(&failing).verify().await.unwrap_err();
        assert!(matches!(err, ConnectorError::Rejected { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_metadata_connect_verifies() {
        let host = stub_server(StubStatus::OK, StubStatus::OK).await;

        let handle = metadata_connector(&host).connect().await.unwrap();
        assert_eq!(handle.project_id(), "flowline-test");
        assert!(!handle.is_emulator());
    }

    #[tokio::test]
    async fn test_rejected_token_fails_connect() {
        let host = stub_server(StubStatus::UNAUTHORIZED, StubStatus::OK).await;

        let err = metadata_connector(&host).connect().await.unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::Credentials(CredentialError::TokenExchange { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_denied_database_degrades_dashboard() {
        for status in [StubStatus::FORBIDDEN, StubStatus::INTERNAL_SERVER_ERROR] {
            let host = stub_server(StubStatus::OK, status).await;
            let connector = Arc::new(ServiceConnector::new(Arc::new(metadata_connector(&host))));
            let dashboard = Dashboard::new(DashboardOptions::connected(), Some(connector.clone()));

            let page = dashboard.render_page().await;
            assert_eq!(page.status_text(), Some(DEGRADED_MESSAGE));
            assert_eq!(page.notices().count(), 1);
            assert!(matches!(
                connector.peek(),
                Some(ConnectionOutcome::Unavailable { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_emulator_requests_carry_user_agent() {
        let host = stub_server(StubStatus::OK, StubStatus::OK).await;
        let env = AmbientEnv {
            emulator_host: Some(host),
            ..Default::default()
        };
        let connector = FirestoreConnector::new(
            FirestoreConfig {
                verify_connection: true,
                ..Default::default()
            },
            env,
        )
        .unwrap();

        let handle = connector.connect().await.unwrap();
        assert!(handle.is_emulator());
    }
}
