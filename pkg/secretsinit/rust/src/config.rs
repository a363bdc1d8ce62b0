// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::cli::Args;
use crate::secrets::google::{GoogleSettings, metadata_url_from_env};
use crate::secrets::reference::ParseOptions;
use crate::secrets::resolver::ResolverOptions;
use anyhow::{Result, bail};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderKind {
    /// AWS Secrets Manager and SSM Parameter Store
    Aws,
    /// Google Secret Manager
    #[value(alias = "gcp")]
    Google,
    /// Kubernetes Secrets
    #[value(alias = "k8s")]
    Kubernetes,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Aws => write!(f, "aws"),
            ProviderKind::Google => write!(f, "google"),
            ProviderKind::Kubernetes => write!(f, "kubernetes"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderKind,
    pub google: GoogleSettings,
    pub resolver: ResolverOptions,
    pub timeout: Option<Duration>,
    pub drain_timeout: Duration,
    pub command: CommandSpec,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let mut command = args.command.into_iter();
        let Some(program) = command.next() else {
            bail!("no command given, usage: secrets-init [FLAGS] [--] COMMAND [ARGS...]");
        };
        if program.is_empty() {
            bail!("command must not be empty");
        }
        if args.max_concurrent_fetches == Some(0) {
            bail!("--max-concurrent-fetches must be at least 1");
        }

        Ok(Self {
            provider: args.provider,
            google: GoogleSettings {
                project: args.google_project.filter(|p| !p.is_empty()),
                endpoint: args.google_endpoint,
                metadata_url: metadata_url_from_env(),
            },
            resolver: ResolverOptions {
                parse: ParseOptions {
                    json_key_suffix: args.aws_json_key,
                },
                failure_policy: args.failure_policy,
                max_concurrent_fetches: args.max_concurrent_fetches,
            },
            timeout: args.timeout.filter(|&t| t > 0).map(Duration::from_secs),
            drain_timeout: Duration::from_secs(args.drain_timeout),
            command: CommandSpec {
                program,
                args: command.collect(),
            },
        })
    }
}
