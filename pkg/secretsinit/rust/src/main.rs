// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use secrets_init::cli::Args;
use secrets_init::config::Config;
use secrets_init::env::{ResolvedEnvironment, current_environment};
use secrets_init::secrets::{self, ResolveError, Resolver};
use secrets_init::supervisor::{FAILURE_EXIT_CODE, Supervisor, become_subreaper, signals};
use simple_logger::SimpleLogger;

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { FAILURE_EXIT_CODE } else { 0 });
        }
    };

    if let Err(e) = SimpleLogger::new()
        .with_level(args.log_level)
        .with_utc_timestamps()
        .init()
    {
        eprintln!("failed to initialize logging: {e}");
    }

    let code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            FAILURE_EXIT_CODE
        }
    };
    log::logger().flush();
    std::process::exit(code);
}

async fn run(args: Args) -> Result<i32> {
    info!("secrets-init starting (version {})", env!("CARGO_PKG_VERSION"));
    let config = Config::from_args(args)?;

    become_subreaper();
    let mut signals = signals::listen_all()?;

    let env = tokio::select! {
        result = resolve(&config) => result?,
        sig = signals::next_shutdown_signal(&mut signals) => {
            return Err(ResolveError::Cancelled(sig.to_string()).into());
        }
    };

    info!("starting {}", config.command.program);
    Supervisor::new(config.drain_timeout)
        .run(&config.command, &env, signals)
        .await
}

async fn resolve(config: &Config) -> Result<ResolvedEnvironment> {
    let provider = secrets::new_provider(config).await?;
    let resolver = Resolver::new(provider.as_ref(), config.resolver);
    let entries = current_environment();
    let env = match config.timeout {
        Some(limit) => tokio::time::timeout(limit, resolver.resolve_all(entries))
            .await
            .map_err(|_| ResolveError::Timeout(limit.as_secs()))??,
        None => resolver.resolve_all(entries).await?,
    };
    Ok(env)
}
