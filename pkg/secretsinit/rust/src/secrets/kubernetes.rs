// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Kubernetes Secret backend, using the pod's in-cluster service account.

use crate::secrets::error::FetchError;
use crate::secrets::provider::{Provider, unsupported};
use crate::secrets::reference::{K8sSecretRef, SecretReference};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::{Client, Config};
use log::{debug, info};
use tokio::sync::OnceCell;

const NAME: &str = "kubernetes";
const API_SERVER: &str = "Kubernetes API";

#[derive(Default)]
pub struct KubernetesProvider {
    client: OnceCell<Client>,
}

impl KubernetesProvider {
    pub fn new() -> Self {
        Self::default()
    }

    async fn client(&self) -> Result<&Client, FetchError> {
        self.client
            .get_or_try_init(|| async {
                info!("initializing in-cluster Kubernetes client");
                let config = Config::incluster().map_err(|e| {
                    FetchError::backend(
                        API_SERVER,
                        format!("failed to acquire in-cluster config: {e}"),
                    )
                })?;
                Client::try_from(config).map_err(|e| {
                    FetchError::backend(API_SERVER, format!("failed to build client: {e}"))
                })
            })
            .await
    }

    async fn fetch(&self, r: &K8sSecretRef) -> Result<String, FetchError> {
        validate(r)?;
        let client = self.client().await?.clone();
        let secrets: Api<Secret> = Api::namespaced(client, &r.namespace);
        let secret = secrets.get(&r.name).await.map_err(|e| match e {
            kube::Error::Api(ref response) if response.code == 404 => {
                FetchError::NotFound(format!("{}/{}", r.namespace, r.name))
            }
            other => FetchError::backend(API_SERVER, other),
        })?;
        extract_key(&secret, r)
    }
}

fn validate(r: &K8sSecretRef) -> Result<(), FetchError> {
    for (what, value) in [
        ("namespace", &r.namespace),
        ("name", &r.name),
        ("key", &r.key),
    ] {
        if value.is_empty() {
            return Err(FetchError::InvalidReference(format!(
                "k8s:secret:{}:{}:{} has an empty {what}",
                r.namespace, r.name, r.key
            )));
        }
    }
    Ok(())
}

fn extract_key(secret: &Secret, r: &K8sSecretRef) -> Result<String, FetchError> {
    let qualified = format!("{}/{}", r.namespace, r.name);
    let bytes = secret
        .data
        .as_ref()
        .and_then(|data| data.get(&r.key))
        .ok_or_else(|| FetchError::MissingKey {
            name: qualified.clone(),
            key: r.key.clone(),
        })?;
    String::from_utf8(bytes.0.clone()).map_err(|e| FetchError::decode(qualified, e))
}

#[async_trait]
impl Provider for KubernetesProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self, reference: &SecretReference) -> bool {
        matches!(reference, SecretReference::Kubernetes(_))
    }

    async fn resolve(&self, reference: &SecretReference) -> Result<String, FetchError> {
        let SecretReference::Kubernetes(r) = reference else {
            return Err(unsupported(NAME, reference));
        };
        debug!("fetching {reference}");
        self.fetch(r).await
    }
}
