// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! AWS Secrets Manager and SSM Parameter Store backend.

use crate::secrets::error::FetchError;
use crate::secrets::payload::{json_object, member_text};
use crate::secrets::provider::{Provider, unsupported};
use crate::secrets::reference::SecretReference;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::OnceCell;

const NAME: &str = "aws";
const SECRETS_MANAGER: &str = "AWS Secrets Manager";
const PARAMETER_STORE: &str = "AWS Parameter Store";

/// The two AWS calls the provider needs.
#[async_trait]
pub trait AwsApi: Send + Sync {
    async fn get_secret_value(&self, secret_id: &str) -> Result<String, FetchError>;

    /// Always fetched with decryption enabled.
    async fn get_parameter(&self, name: &str) -> Result<String, FetchError>;
}

/// [`AwsApi`] backed by the AWS SDK, configured from the ambient credentials chain.
pub struct SdkApi {
    secrets_manager: aws_sdk_secretsmanager::Client,
    ssm: aws_sdk_ssm::Client,
}

impl SdkApi {
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self {
            secrets_manager: aws_sdk_secretsmanager::Client::new(&config),
            ssm: aws_sdk_ssm::Client::new(&config),
        }
    }
}

#[async_trait]
impl AwsApi for SdkApi {
    async fn get_secret_value(&self, secret_id: &str) -> Result<String, FetchError> {
        let output = self
            .secrets_manager
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception())
                {
                    FetchError::NotFound(secret_id.to_string())
                } else {
                    FetchError::backend(
                        SECRETS_MANAGER,
                        aws_sdk_secretsmanager::error::DisplayErrorContext(&e),
                    )
                }
            })?;

        if let Some(secret) = output.secret_string() {
            return Ok(secret.to_string());
        }
        match output.secret_binary() {
            Some(blob) => String::from_utf8(blob.as_ref().to_vec())
                .map_err(|e| FetchError::decode(secret_id, e)),
            None => Err(FetchError::EmptyPayload(secret_id.to_string())),
        }
    }

    async fn get_parameter(&self, name: &str) -> Result<String, FetchError> {
        let output = self
            .ssm
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| {
                    se.is_parameter_not_found() || se.is_parameter_version_not_found()
                }) {
                    FetchError::NotFound(name.to_string())
                } else {
                    FetchError::backend(
                        PARAMETER_STORE,
                        aws_sdk_ssm::error::DisplayErrorContext(&e),
                    )
                }
            })?;

        output
            .parameter()
            .and_then(|p| p.value())
            .map(str::to_string)
            .ok_or_else(|| FetchError::EmptyPayload(name.to_string()))
    }
}

/// Resolves `arn:aws:secretsmanager` and `arn:aws:ssm` references.
///
/// The SDK clients are built on first use and shared for the process lifetime.
#[derive(Default)]
pub struct AwsProvider {
    api: OnceCell<Arc<dyn AwsApi>>,
}

impl AwsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a pre-built API instead of the SDK.
    pub fn with_api(api: Arc<dyn AwsApi>) -> Self {
        Self {
            api: OnceCell::new_with(Some(api)),
        }
    }

    async fn api(&self) -> &dyn AwsApi {
        self.api
            .get_or_init(|| async {
                info!("initializing AWS clients");
                Arc::new(SdkApi::from_env().await) as Arc<dyn AwsApi>
            })
            .await
            .as_ref()
    }
}

#[async_trait]
impl Provider for AwsProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self, reference: &SecretReference) -> bool {
        matches!(
            reference,
            SecretReference::AwsSecretsManager(_) | SecretReference::AwsSsmParameter(_)
        )
    }

    async fn resolve(&self, reference: &SecretReference) -> Result<String, FetchError> {
        match reference {
            SecretReference::AwsSecretsManager(r) => {
                debug!("fetching {reference}");
                let payload = self.api().await.get_secret_value(&r.secret_id).await?;
                match &r.json_key {
                    Some(key) => select_key(&r.secret_id, &payload, key),
                    None => Ok(payload),
                }
            }
            SecretReference::AwsSsmParameter(r) => {
                debug!("fetching {reference}");
                self.api().await.get_parameter(&r.qualified_name()).await
            }
            other => Err(unsupported(NAME, other)),
        }
    }
}

fn select_key(secret_id: &str, payload: &str, key: &str) -> Result<String, FetchError> {
    let object = json_object(payload)
        .ok_or_else(|| FetchError::decode(secret_id, "payload is not a JSON object"))?;
    object
        .get(key)
        .map(member_text)
        .ok_or_else(|| FetchError::MissingKey {
            name: secret_id.to_string(),
            key: key.to_string(),
        })
}
