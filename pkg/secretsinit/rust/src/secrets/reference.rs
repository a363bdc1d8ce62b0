// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Recognition of secret references embedded in environment values.
//!
//! Supported grammars:
//!
//! - `arn:aws:secretsmanager...` (opaque ARN, optionally `<arn>#<key>`)
//! - `arn:aws:ssm:<region>:<account>:parameter/<path>[:<version>]`
//! - `gcp:secretmanager:<name-or-projects/P/secrets/S>[/versions/<version>]`
//! - `k8s:secret:<namespace>:<name>:<key>`
//!
//! Parsing never fails. Values that carry a known prefix but have the wrong
//! shape are left alone, exactly like values without any prefix.

use crate::secrets::error::FetchError;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

const AWS_SECRETS_MANAGER_PREFIX: &str = "arn:aws:secretsmanager";
const AWS_SSM_PREFIX: &str = "arn:aws:ssm";
const AWS_SSM_PARAMETER_MARKER: &str = ":parameter/";
const GCP_PREFIX: &str = "gcp:secretmanager:";
const K8S_PREFIX: &str = "k8s:secret:";

const SSM_TOKENS: usize = 6;
const SSM_TOKENS_WITH_VERSION: usize = 7;
const K8S_TOKENS: usize = 5;

static GCP_FULL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^projects/[^/]+/secrets/[^/]+").expect("valid regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Accept `<arn>#<key>` to select a single field of a JSON secret.
    pub json_key_suffix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsManagerRef {
    pub secret_id: String,
    pub json_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsmParameterRef {
    pub name: String,
    pub version: Option<String>,
}

impl SsmParameterRef {
    /// Parameter name as sent to SSM: `name` or `name:version`.
    pub fn qualified_name(&self) -> String {
        match &self.version {
            Some(version) => format!("{}:{version}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcpSecretRef {
    /// Everything after `gcp:secretmanager:`, either a short name or a full
    /// `projects/.../secrets/...` path, with or without `/versions/...`.
    pub name: String,
}

impl GcpSecretRef {
    pub fn is_full_name(&self) -> bool {
        GCP_FULL_NAME.is_match(&self.name)
    }

    /// Build the Secret Manager resource name of the secret version.
    ///
    /// Short names are qualified with `default_project`, and `/versions/latest`
    /// is appended when no version is given.
    pub fn resource_name(&self, default_project: Option<&str>) -> Result<String, FetchError> {
        let mut name = if self.is_full_name() {
            self.name.clone()
        } else {
            let project = default_project
                .filter(|p| !p.is_empty())
                .ok_or_else(|| FetchError::UnknownProject(self.name.clone()))?;
            format!("projects/{project}/secrets/{}", self.name)
        };
        if !name.contains("/versions/") {
            name.push_str("/versions/latest");
        }
        Ok(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct K8sSecretRef {
    pub namespace: String,
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretReference {
    AwsSecretsManager(SecretsManagerRef),
    AwsSsmParameter(SsmParameterRef),
    Gcp(GcpSecretRef),
    Kubernetes(K8sSecretRef),
}

impl SecretReference {
    /// Parse with default options (no JSON key suffix).
    pub fn parse(value: &str) -> Option<Self> {
        Self::parse_with(value, ParseOptions::default())
    }

    pub fn parse_with(value: &str, options: ParseOptions) -> Option<Self> {
        if value.starts_with(AWS_SECRETS_MANAGER_PREFIX) {
            return Some(parse_secrets_manager(value, options));
        }
        if value.starts_with(AWS_SSM_PREFIX) && value.contains(AWS_SSM_PARAMETER_MARKER) {
            return parse_ssm(value).map(SecretReference::AwsSsmParameter);
        }
        if let Some(name) = value.strip_prefix(GCP_PREFIX) {
            if name.is_empty() {
                return None;
            }
            return Some(SecretReference::Gcp(GcpSecretRef {
                name: name.to_string(),
            }));
        }
        if value.starts_with(K8S_PREFIX) {
            return parse_k8s(value).map(SecretReference::Kubernetes);
        }
        None
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretReference::AwsSecretsManager(r) => match &r.json_key {
                Some(key) => write!(f, "secretsmanager {}#{key}", r.secret_id),
                None => write!(f, "secretsmanager {}", r.secret_id),
            },
            SecretReference::AwsSsmParameter(r) => write!(f, "ssm {}", r.qualified_name()),
            SecretReference::Gcp(r) => write!(f, "gcp {}", r.name),
            SecretReference::Kubernetes(r) => {
                write!(f, "k8s {}/{}[{}]", r.namespace, r.name, r.key)
            }
        }
    }
}

fn parse_secrets_manager(value: &str, options: ParseOptions) -> SecretReference {
    if options.json_key_suffix
        && let Some((secret_id, key)) = value.rsplit_once('#')
    {
        return SecretReference::AwsSecretsManager(SecretsManagerRef {
            secret_id: secret_id.to_string(),
            json_key: (!key.is_empty()).then(|| key.to_string()),
        });
    }
    SecretReference::AwsSecretsManager(SecretsManagerRef {
        secret_id: value.to_string(),
        json_key: None,
    })
}

// arn:aws:ssm:REGION:ACCOUNT:parameter/PATH[:VERSION]
fn parse_ssm(value: &str) -> Option<SsmParameterRef> {
    let tokens: Vec<&str> = value.split(':').collect();
    if tokens.len() != SSM_TOKENS && tokens.len() != SSM_TOKENS_WITH_VERSION {
        return None;
    }
    let path = tokens.get(5)?;
    let name = path.strip_prefix("parameter").unwrap_or(path);
    let version = tokens.get(6).map(|v| v.to_string());
    Some(SsmParameterRef {
        name: name.to_string(),
        version,
    })
}

// k8s:secret:NAMESPACE:NAME:KEY
fn parse_k8s(value: &str) -> Option<K8sSecretRef> {
    let tokens: Vec<&str> = value.split(':').collect();
    if tokens.len() != K8S_TOKENS {
        return None;
    }
    Some(K8sSecretRef {
        namespace: tokens.get(2)?.to_string(),
        name: tokens.get(3)?.to_string(),
        key: tokens.get(4)?.to_string(),
    })
}
