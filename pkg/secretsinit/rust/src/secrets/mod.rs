// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

pub mod aws;
pub mod error;
pub mod google;
pub mod kubernetes;
mod payload;
pub mod provider;
pub mod reference;
pub mod resolver;

pub use error::{FetchError, ResolveError};
pub use provider::Provider;
pub use reference::{ParseOptions, SecretReference};
pub use resolver::{FailurePolicy, Resolver, ResolverOptions};

use crate::config::{Config, ProviderKind};
use anyhow::Result;
use log::info;

/// Build the backend selected by the configuration.
pub async fn new_provider(config: &Config) -> Result<Box<dyn Provider>> {
    info!("using the {} secret provider", config.provider);
    let provider: Box<dyn Provider> = match config.provider {
        ProviderKind::Aws => Box::new(aws::AwsProvider::new()),
        ProviderKind::Google => Box::new(google::GoogleProvider::new(config.google.clone()).await?),
        ProviderKind::Kubernetes => Box::new(kubernetes::KubernetesProvider::new()),
    };
    Ok(provider)
}
