// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Google Secret Manager backend.
//!
//! Talks to the Secret Manager REST API. Access tokens come from Application
//! Default Credentials (`GOOGLE_APPLICATION_CREDENTIALS`, gcloud user
//! credentials, workload identity or the metadata server), or only from the
//! metadata server when `GCE_METADATA_HOST` names one explicitly.

use crate::secrets::error::FetchError;
use crate::secrets::provider::{Provider, unsupported};
use crate::secrets::reference::SecretReference;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gcp_auth::TokenProvider;
use log::{debug, info};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

pub const DEFAULT_ENDPOINT: &str = "https://secretmanager.googleapis.com";

const NAME: &str = "google";
const SECRET_MANAGER: &str = "Google Secret Manager";
const METADATA_SERVER: &str = "GCE metadata server";
const DEFAULT_CREDENTIALS: &str = "Google application default credentials";
const METADATA_TIMEOUT: Duration = Duration::from_secs(5);
const SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

#[derive(Debug, Clone)]
pub struct GoogleSettings {
    /// Project used to qualify short secret names. Discovered from the
    /// credentials when unset.
    pub project: Option<String>,
    /// Base URL of the Secret Manager REST API.
    pub endpoint: String,
    /// Metadata server to take tokens from instead of the default
    /// credential chain.
    pub metadata_url: Option<String>,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            project: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            metadata_url: metadata_url_from_env(),
        }
    }
}

/// Metadata server URL named by `GCE_METADATA_HOST`, if any.
pub fn metadata_url_from_env() -> Option<String> {
    std::env::var("GCE_METADATA_HOST")
        .ok()
        .filter(|h| !h.is_empty())
        .map(|host| format!("http://{host}"))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct AccessResponse {
    payload: AccessPayload,
}

#[derive(Deserialize)]
struct AccessPayload {
    #[serde(default)]
    data: String,
}

enum Credentials {
    /// Application Default Credentials. Tokens are cached and refreshed by
    /// the provider.
    Default(OnceCell<Arc<dyn TokenProvider>>),
    /// A metadata server at a fixed address.
    Metadata { url: String, token: OnceCell<String> },
}

impl Credentials {
    fn describe(&self) -> &'static str {
        match self {
            Credentials::Default(_) => DEFAULT_CREDENTIALS,
            Credentials::Metadata { .. } => METADATA_SERVER,
        }
    }

    async fn default_provider(
        cell: &OnceCell<Arc<dyn TokenProvider>>,
    ) -> Result<&Arc<dyn TokenProvider>, FetchError> {
        cell.get_or_try_init(|| async {
            gcp_auth::provider()
                .await
                .map_err(|e| FetchError::backend(DEFAULT_CREDENTIALS, e))
        })
        .await
    }

    async fn project_id(&self, http: &reqwest::Client) -> Result<String, FetchError> {
        match self {
            Credentials::Default(cell) => {
                let provider = Self::default_provider(cell).await?;
                let project = provider
                    .project_id()
                    .await
                    .map_err(|e| FetchError::backend(DEFAULT_CREDENTIALS, e))?;
                Ok(project.to_string())
            }
            Credentials::Metadata { url, .. } => {
                metadata_get(http, url, "project/project-id").await
            }
        }
    }

    async fn token(&self, http: &reqwest::Client) -> Result<String, FetchError> {
        match self {
            Credentials::Default(cell) => {
                let provider = Self::default_provider(cell).await?;
                let token = provider
                    .token(SCOPES)
                    .await
                    .map_err(|e| FetchError::backend(DEFAULT_CREDENTIALS, e))?;
                Ok(token.as_str().to_string())
            }
            Credentials::Metadata { url, token } => {
                let token = token
                    .get_or_try_init(|| async {
                        let body =
                            metadata_get(http, url, "instance/service-accounts/default/token")
                                .await?;
                        let token: TokenResponse = serde_json::from_str(&body)
                            .map_err(|e| FetchError::backend(METADATA_SERVER, e))?;
                        Ok::<_, FetchError>(token.access_token)
                    })
                    .await?;
                Ok(token.clone())
            }
        }
    }
}

pub struct GoogleProvider {
    http: reqwest::Client,
    endpoint: String,
    project: Option<String>,
    credentials: Credentials,
}

impl GoogleProvider {
    /// Build the provider and settle the default project once.
    pub async fn new(settings: GoogleSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to initialize HTTP client for Google Secret Manager")?;
        let credentials = match settings.metadata_url {
            Some(url) => Credentials::Metadata {
                url,
                token: OnceCell::new(),
            },
            None => Credentials::Default(OnceCell::new()),
        };
        debug!("using {} for Google access tokens", credentials.describe());

        let project = match settings.project.filter(|p| !p.is_empty()) {
            Some(project) => Some(project),
            None => match credentials.project_id(&http).await {
                Ok(project) => {
                    info!("detected Google project {project}");
                    Some(project)
                }
                Err(e) => {
                    info!(
                        "the Google project cannot be detected ({e}), \
                         short secret names cannot be resolved"
                    );
                    None
                }
            },
        };

        Ok(Self {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            project,
            credentials,
        })
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    async fn access(&self, resource: &str) -> Result<String, FetchError> {
        let token = self.credentials.token(&self.http).await?;
        let url = format!("{}/v1/{resource}:access", self.endpoint);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| FetchError::backend(SECRET_MANAGER, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(resource.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::backend(
                SECRET_MANAGER,
                format!("{status}: {}", body.trim()),
            ));
        }

        let access: AccessResponse = response
            .json()
            .await
            .map_err(|e| FetchError::decode(resource, e))?;
        let bytes = STANDARD
            .decode(access.payload.data.as_bytes())
            .map_err(|e| FetchError::decode(resource, e))?;
        String::from_utf8(bytes).map_err(|e| FetchError::decode(resource, e))
    }
}

async fn metadata_get(
    http: &reqwest::Client,
    base: &str,
    path: &str,
) -> Result<String, FetchError> {
    let url = format!("{}/computeMetadata/v1/{path}", base.trim_end_matches('/'));
    let response = http
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .timeout(METADATA_TIMEOUT)
        .send()
        .await
        .map_err(|e| FetchError::backend(METADATA_SERVER, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::backend(
            METADATA_SERVER,
            format!("{path}: {status}"),
        ));
    }
    let body = response
        .text()
        .await
        .map_err(|e| FetchError::backend(METADATA_SERVER, e))?;
    Ok(body.trim().to_string())
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self, reference: &SecretReference) -> bool {
        matches!(reference, SecretReference::Gcp(_))
    }

    async fn resolve(&self, reference: &SecretReference) -> Result<String, FetchError> {
        let SecretReference::Gcp(r) = reference else {
            return Err(unsupported(NAME, reference));
        };
        let resource = r.resource_name(self.project())?;
        debug!("fetching gcp {resource}");
        self.access(&resource).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(
                "/computeMetadata/v1/instance/service-accounts/default/token",
            ))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok",
                "expires_in": 3599,
                "token_type": "Bearer",
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    async fn mount_secret(server: &MockServer, resource: &str, value: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/{resource}:access")))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": resource,
                "payload": { "data": STANDARD.encode(value) },
            })))
            .mount(server)
            .await;
    }

    fn settings(server: &MockServer, project: Option<&str>) -> GoogleSettings {
        GoogleSettings {
            project: project.map(String::from),
            endpoint: server.uri(),
            metadata_url: Some(server.uri()),
        }
    }

    fn gcp(value: &str) -> SecretReference {
        SecretReference::parse(value).unwrap()
    }

    #[tokio::test]
    async fn test_short_name_with_explicit_project() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        mount_secret(&server, "projects/p/secrets/db/versions/latest", "s3cr3t").await;

        let provider = GoogleProvider::new(settings(&server, Some("p"))).await.unwrap();
        assert_eq!(provider.project(), Some("p"));
        let value = provider
            .resolve(&gcp("gcp:secretmanager:db"))
            .await
            .unwrap();
        assert_eq!(value, "s3cr3t");
    }

    #[tokio::test]
    async fn test_project_discovered_from_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/computeMetadata/v1/project/project-id"))
            .respond_with(ResponseTemplate::new(200).set_body_string("discovered\n"))
            .expect(1)
            .mount(&server)
            .await;
        mount_token(&server, 1).await;
        mount_secret(&server, "projects/discovered/secrets/db/versions/3", "v3").await;

        let provider = GoogleProvider::new(settings(&server, None)).await.unwrap();
        assert_eq!(provider.project(), Some("discovered"));
        let value = provider
            .resolve(&gcp("gcp:secretmanager:db/versions/3"))
            .await
            .unwrap();
        assert_eq!(value, "v3");
    }

    #[tokio::test]
    async fn test_unknown_project_only_fails_short_names() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        mount_secret(&server, "projects/other/secrets/api/versions/latest", "key").await;

        let provider = GoogleProvider::new(settings(&server, None)).await.unwrap();
        assert_eq!(provider.project(), None);

        let err = provider
            .resolve(&gcp("gcp:secretmanager:db"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UnknownProject(_)));

        let value = provider
            .resolve(&gcp("gcp:secretmanager:projects/other/secrets/api"))
            .await
            .unwrap();
        assert_eq!(value, "key");
    }

    #[tokio::test]
    async fn test_token_is_fetched_once() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        mount_secret(&server, "projects/p/secrets/a/versions/latest", "1").await;
        mount_secret(&server, "projects/p/secrets/b/versions/latest", "2").await;

        let provider = GoogleProvider::new(settings(&server, Some("p"))).await.unwrap();
        let ref_a = gcp("gcp:secretmanager:a");
        let ref_b = gcp("gcp:secretmanager:b");
        let (a, b) = tokio::join!(provider.resolve(&ref_a), provider.resolve(&ref_b));
        assert_eq!(a.unwrap(), "1");
        assert_eq!(b.unwrap(), "2");
    }

    #[tokio::test]
    async fn test_missing_secret_is_not_found() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/p/secrets/gone/versions/latest:access"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": 404, "status": "NOT_FOUND" },
            })))
            .mount(&server)
            .await;

        let provider = GoogleProvider::new(settings(&server, Some("p"))).await.unwrap();
        let err = provider
            .resolve(&gcp("gcp:secretmanager:gone"))
            .await
            .unwrap_err();
        let expected = "projects/p/secrets/gone/versions/latest";
        assert!(matches!(err, FetchError::NotFound(ref r) if r == expected));
    }

    #[tokio::test]
    async fn test_permission_denied_is_backend_error() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/p/secrets/locked/versions/latest:access"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let provider = GoogleProvider::new(settings(&server, Some("p"))).await.unwrap();
        let err = provider
            .resolve(&gcp("gcp:secretmanager:locked"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Backend { .. }));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_token_failure_is_backend_error() {
        let server = MockServer::start().await;
        let provider = GoogleProvider::new(settings(&server, Some("p"))).await.unwrap();
        let err = provider
            .resolve(&gcp("gcp:secretmanager:db"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Backend { service, .. } if service == METADATA_SERVER));
    }

    #[tokio::test]
    async fn test_credentials_source_follows_metadata_override() {
        let server = MockServer::start().await;
        let provider = GoogleProvider::new(settings(&server, Some("p"))).await.unwrap();
        assert_eq!(provider.credentials.describe(), METADATA_SERVER);

        let settings = GoogleSettings {
            metadata_url: None,
            ..settings(&server, Some("p"))
        };
        let provider = GoogleProvider::new(settings).await.unwrap();
        assert_eq!(provider.credentials.describe(), DEFAULT_CREDENTIALS);
        assert_eq!(provider.project(), Some("p"));
    }

    #[tokio::test]
    async fn test_supports_only_gcp() {
        let server = MockServer::start().await;
        let provider = GoogleProvider::new(settings(&server, Some("p"))).await.unwrap();
        assert!(provider.supports(&gcp("gcp:secretmanager:db")));
        assert!(!provider.supports(&gcp("arn:aws:secretsmanager:x")));
        assert!(!provider.supports(&gcp("k8s:secret:a:b:c")));
    }
}
