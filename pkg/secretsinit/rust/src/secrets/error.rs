// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use thiserror::Error;

/// Failure to fetch a single secret from a backend.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{service} request failed: {message}")]
    Backend {
        service: &'static str,
        message: String,
    },
    #[error("secret {0} not found")]
    NotFound(String),
    #[error("secret {name} has no key {key:?}")]
    MissingKey { name: String, key: String },
    #[error("secret {0} has no usable payload")]
    EmptyPayload(String),
    #[error("failed to decode secret {name}: {message}")]
    Decode { name: String, message: String },
    #[error("cannot resolve secret {0:?}: unknown Google project")]
    UnknownProject(String),
    #[error("invalid secret reference: {0}")]
    InvalidReference(String),
    #[error("{provider} provider cannot resolve {reference}")]
    Unsupported {
        provider: &'static str,
        reference: String,
    },
}

impl FetchError {
    pub(crate) fn backend(service: &'static str, message: impl ToString) -> Self {
        FetchError::Backend {
            service,
            message: message.to_string(),
        }
    }

    pub(crate) fn decode(name: impl Into<String>, message: impl ToString) -> Self {
        FetchError::Decode {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

/// Failure of a whole environment resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("failed to resolve {key}: {source}")]
    Fetch {
        key: String,
        #[source]
        source: FetchError,
    },
    #[error("secret resolution timed out after {0}s")]
    Timeout(u64),
    #[error("secret resolution cancelled by {0}")]
    Cancelled(String),
}
