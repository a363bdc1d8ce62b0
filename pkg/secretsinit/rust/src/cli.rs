// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::ProviderKind;
use crate::secrets::google::DEFAULT_ENDPOINT;
use crate::secrets::resolver::FailurePolicy;
use clap::Parser;

/// Resolve secret references in the environment, then run COMMAND as a
/// supervised child that receives forwarded signals.
#[derive(Parser, Debug, Clone)]
#[command(name = "secrets-init", version)]
#[command(about = "Container entrypoint that injects secrets into the environment")]
pub struct Args {
    /// Secret backend
    #[arg(long, env = "SECRETS_INIT_PROVIDER", value_enum, default_value_t = ProviderKind::Aws)]
    pub provider: ProviderKind,

    /// Default Google project for short secret names
    #[arg(long, env = "GOOGLE_PROJECT")]
    pub google_project: Option<String>,

    /// Google Secret Manager REST endpoint
    #[arg(long, env = "SECRETS_INIT_GOOGLE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub google_endpoint: String,

    /// Accept a `#key` suffix on Secrets Manager references to select one
    /// member of a JSON secret
    #[arg(long, env = "SECRETS_INIT_AWS_JSON_KEY")]
    pub aws_json_key: bool,

    /// What to do when a secret cannot be fetched
    #[arg(
        long,
        env = "SECRETS_INIT_FAILURE_POLICY",
        value_enum,
        default_value_t = FailurePolicy::FailClosed
    )]
    pub failure_policy: FailurePolicy,

    /// Maximum number of secrets fetched at the same time [default: all]
    #[arg(long, env = "SECRETS_INIT_MAX_CONCURRENT_FETCHES", value_parser = parse_concurrency)]
    pub max_concurrent_fetches: Option<usize>,

    /// Abort secret resolution after this many seconds
    #[arg(long, env = "SECRETS_INIT_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Keep reaping orphaned processes for up to this many seconds after the
    /// command exits
    #[arg(long, env = "SECRETS_INIT_DRAIN_TIMEOUT", default_value = "0")]
    pub drain_timeout: u64,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(
        long,
        env = "SECRETS_INIT_LOG_LEVEL",
        default_value = "info",
        value_parser = parse_level
    )]
    pub log_level: log::LevelFilter,

    /// Command to run, followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

fn parse_concurrency(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_level(s: &str) -> Result<log::LevelFilter, String> {
    s.parse().map_err(|_| {
        format!("unknown log level {s:?}, expected off, error, warn, info, debug or trace")
    })
}
