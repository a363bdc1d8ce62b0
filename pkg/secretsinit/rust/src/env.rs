// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::ffi::{OsStr, OsString};

/// One `KEY=VALUE` pair of a process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentEntry {
    pub key: OsString,
    pub value: OsString,
}

impl EnvironmentEntry {
    pub fn new(key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Split a raw `KEY=VALUE` string at the first `=`. Values may contain `=`.
    /// Returns `None` when there is no `=` at all.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let (key, value) = raw.split_once('=')?;
        Some(Self::new(key, value))
    }

    /// The value as UTF-8, if it is valid UTF-8.
    pub fn value_str(&self) -> Option<&str> {
        self.value.to_str()
    }

    pub fn key_lossy(&self) -> std::borrow::Cow<'_, str> {
        self.key.to_string_lossy()
    }
}

/// Snapshot of the current process environment, in the order the OS reports it.
pub fn current_environment() -> Vec<EnvironmentEntry> {
    std::env::vars_os()
        .map(|(key, value)| EnvironmentEntry { key, value })
        .collect()
}

/// The environment handed to the child after secret substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedEnvironment(Vec<EnvironmentEntry>);

impl ResolvedEnvironment {
    pub fn entries(&self) -> &[EnvironmentEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        let key = key.as_ref();
        self.0
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_os_str())
    }

    /// Iterate over `(key, value)` pairs, the shape `Command::envs` expects.
    pub fn pairs(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.0.iter().map(|e| (e.key.as_os_str(), e.value.as_os_str()))
    }
}

impl From<Vec<EnvironmentEntry>> for ResolvedEnvironment {
    fn from(entries: Vec<EnvironmentEntry>) -> Self {
        Self(entries)
    }
}

impl IntoIterator for ResolvedEnvironment {
    type Item = EnvironmentEntry;
    type IntoIter = std::vec::IntoIter<EnvironmentEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
