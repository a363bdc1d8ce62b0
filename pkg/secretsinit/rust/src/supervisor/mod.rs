// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

pub mod process;
mod reaper;
pub mod signals;
pub mod state;

use crate::config::CommandSpec;
use crate::env::ResolvedEnvironment;
use anyhow::{Result, bail};
use log::{debug, error, warn};
use nix::sys::signal::Signal;
use state::SupervisorState;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Exit code for any failure before the command's own status is known.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Ask the kernel to re-parent orphaned descendants to this process. Not
/// needed when running as PID 1.
pub fn become_subreaper() {
    #[cfg(target_os = "linux")]
    {
        if nix::unistd::getpid().as_raw() == 1 {
            return;
        }
        match nix::sys::prctl::set_child_subreaper(true) {
            Ok(()) => debug!("registered as child subreaper"),
            Err(e) => warn!("failed to become a child subreaper, orphans may not be reaped: {e}"),
        }
    }
}

/// Runs one command to completion: spawn, forward signals, reap.
pub struct Supervisor {
    state: SupervisorState,
    drain_timeout: Duration,
}

impl Supervisor {
    pub fn new(drain_timeout: Duration) -> Self {
        Self {
            state: SupervisorState::Idle,
            drain_timeout,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    fn transition(&mut self, next: SupervisorState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            bail!("invalid supervisor transition: {} -> {next}", self.state);
        }
        debug!("supervisor {} -> {next}", self.state);
        self.state = next;
        Ok(())
    }

    /// Start `command` with `env` and return the exit code to terminate with.
    ///
    /// `signals` is the queue filled by [`signals::listen_all`]; from here on
    /// its contents go to the command's process group.
    pub async fn run(
        &mut self,
        command: &CommandSpec,
        env: &ResolvedEnvironment,
        signals: mpsc::Receiver<Signal>,
    ) -> Result<i32> {
        self.transition(SupervisorState::Starting)?;
        let child = match process::spawn_child(command, env) {
            Ok(child) => child,
            Err(e) => {
                self.transition(SupervisorState::Terminated)?;
                return Err(e);
            }
        };
        self.transition(SupervisorState::Running)?;

        let reaper = reaper::spawn(child.pid())?;
        let forwarder = tokio::spawn(signals::forward_signals(signals, child.pgid()));

        let code = match reaper.exit.await {
            Ok(exit) => exit.code(),
            Err(_) => {
                error!("{command} (pid={}) was never observed to exit", child.pid());
                FAILURE_EXIT_CODE
            }
        };

        if !self.drain_timeout.is_zero() {
            match timeout(self.drain_timeout, reaper.drained).await {
                Ok(_) => debug!("all descendants reaped"),
                Err(_) => warn!(
                    "descendants still running after {}s, exiting anyway",
                    self.drain_timeout.as_secs()
                ),
            }
        }

        forwarder.abort();
        self.transition(SupervisorState::Terminated)?;
        Ok(code)
    }
}
