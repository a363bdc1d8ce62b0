// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::env::{EnvironmentEntry, ResolvedEnvironment};
use crate::secrets::error::{FetchError, ResolveError};
use crate::secrets::payload::{json_object, member_text};
use crate::secrets::provider::Provider;
use crate::secrets::reference::{ParseOptions, SecretReference};
use futures::{StreamExt, TryStreamExt, stream};
use log::{debug, info, warn};

/// What to do when a single secret cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Abort the whole resolution; the command is not started.
    #[default]
    FailClosed,
    /// Log the failure and keep the unresolved reference as the value.
    KeepOriginal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    pub parse: ParseOptions,
    pub failure_policy: FailurePolicy,
    /// Upper bound on in-flight fetches. `None` fetches every entry at once.
    pub max_concurrent_fetches: Option<usize>,
}

/// Rewrites an environment by replacing secret references with their values.
pub struct Resolver<'a> {
    provider: &'a dyn Provider,
    options: ResolverOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(provider: &'a dyn Provider, options: ResolverOptions) -> Self {
        Self { provider, options }
    }

    /// Resolve every entry concurrently, keeping the input order.
    ///
    /// Fetches complete in any order. Under [`FailurePolicy::FailClosed`] the
    /// first error to complete aborts the call and drops all in-flight
    /// fetches.
    pub async fn resolve_all(
        &self,
        entries: Vec<EnvironmentEntry>,
    ) -> Result<ResolvedEnvironment, ResolveError> {
        let total = entries.len();
        let limit = self.options.max_concurrent_fetches.unwrap_or(total).max(1);
        let mut resolved: Vec<(usize, Vec<EnvironmentEntry>)> =
            stream::iter(entries.into_iter().enumerate())
                .map(|(index, entry)| async move {
                    self.resolve_entry(entry).await.map(|out| (index, out))
                })
                .buffer_unordered(limit)
                .try_collect()
                .await?;
        resolved.sort_unstable_by_key(|(index, _)| *index);

        let env: Vec<EnvironmentEntry> = resolved.into_iter().flat_map(|(_, out)| out).collect();
        info!(
            "resolved environment with the {} provider ({total} variable(s) in, {} out)",
            self.provider.name(),
            env.len()
        );
        Ok(env.into())
    }

    async fn resolve_entry(
        &self,
        entry: EnvironmentEntry,
    ) -> Result<Vec<EnvironmentEntry>, ResolveError> {
        let Some(reference) = entry
            .value_str()
            .and_then(|value| SecretReference::parse_with(value, self.options.parse))
        else {
            return Ok(vec![entry]);
        };

        if !self.provider.supports(&reference) {
            debug!(
                "{}: {reference} is not handled by the {} provider, leaving it as is",
                entry.key_lossy(),
                self.provider.name()
            );
            return Ok(vec![entry]);
        }

        let outcome = self
            .provider
            .resolve(&reference)
            .await
            .and_then(|value| substitute(&entry, &reference, value));
        match outcome {
            Ok(resolved) => Ok(resolved),
            Err(source) => match self.options.failure_policy {
                FailurePolicy::FailClosed => Err(ResolveError::Fetch {
                    key: entry.key_lossy().into_owned(),
                    source,
                }),
                FailurePolicy::KeepOriginal => {
                    warn!(
                        "failed to resolve {}: {source}, keeping the original value",
                        entry.key_lossy()
                    );
                    Ok(vec![entry])
                }
            },
        }
    }
}

// A Secrets Manager JSON object without a key selector replaces the entry with
// one entry per member.
fn substitute(
    entry: &EnvironmentEntry,
    reference: &SecretReference,
    value: String,
) -> Result<Vec<EnvironmentEntry>, FetchError> {
    if let SecretReference::AwsSecretsManager(r) = reference
        && r.json_key.is_none()
        && let Some(object) = json_object(&value)
    {
        debug!(
            "{}: expanding JSON secret into {} variable(s)",
            entry.key_lossy(),
            object.len()
        );
        return object
            .iter()
            .map(|(key, member)| {
                check_variable_name(key, reference)?;
                Ok(EnvironmentEntry::new(key, member_text(member)))
            })
            .collect();
    }
    debug!("{}: resolved {reference}", entry.key_lossy());
    Ok(vec![EnvironmentEntry::new(entry.key.clone(), value)])
}

fn check_variable_name(key: &str, reference: &SecretReference) -> Result<(), FetchError> {
    if key.is_empty() || key.contains(['=', '\0']) {
        return Err(FetchError::decode(
            reference.to_string(),
            format!("JSON key {key:?} is not a valid variable name"),
        ));
    }
    Ok(())
}
