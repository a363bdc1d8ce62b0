// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::secrets::error::FetchError;
use crate::secrets::reference::SecretReference;
use async_trait::async_trait;

/// A secret store backend.
///
/// Implementations are shared by all concurrent fetches of one resolution, so
/// any client state must be created once and only read afterwards.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short backend name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether this backend owns the given reference kind. References it does
    /// not own are passed through unresolved.
    fn supports(&self, reference: &SecretReference) -> bool;

    /// Fetch the secret value. Callers must check [`Provider::supports`] first.
    async fn resolve(&self, reference: &SecretReference) -> Result<String, FetchError>;
}

pub(crate) fn unsupported(provider: &'static str, reference: &SecretReference) -> FetchError {
    FetchError::Unsupported {
        provider,
        reference: reference.to_string(),
    }
}
