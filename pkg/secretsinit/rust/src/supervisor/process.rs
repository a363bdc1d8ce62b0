// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::CommandSpec;
use crate::env::ResolvedEnvironment;
use anyhow::{Context, Result};
use log::info;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use std::fmt;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

/// The supervised command. Its pid is also its process group id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildProcess {
    pid: Pid,
}

impl ChildProcess {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn pgid(&self) -> Pid {
        self.pid
    }
}

/// Start `command` in its own process group with `env` as its whole
/// environment.
///
/// The child is never waited on here: its status is collected by the reaper.
pub fn spawn_child(command: &CommandSpec, env: &ResolvedEnvironment) -> Result<ChildProcess> {
    let child = Command::new(&command.program)
        .args(&command.args)
        .env_clear()
        .envs(env.pairs())
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .process_group(0)
        .spawn()
        .with_context(|| format!("failed to spawn: {}", command.program))?;

    let pid = Pid::from_raw(child.id() as i32);
    info!("spawned (pid={pid}, cmd={})", command.program);
    Ok(ChildProcess { pid })
}

/// How a process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    Exited(i32),
    Signaled(Signal),
}

impl ChildExit {
    /// Shell convention: the exit code, or 128 + signal number.
    pub fn code(self) -> i32 {
        match self {
            ChildExit::Exited(code) => code,
            ChildExit::Signaled(sig) => 128 + sig as i32,
        }
    }

    /// Terminal statuses only; stop/continue notifications yield `None`.
    pub(crate) fn from_wait_status(status: WaitStatus) -> Option<(Pid, ChildExit)> {
        match status {
            WaitStatus::Exited(pid, code) => Some((pid, ChildExit::Exited(code))),
            WaitStatus::Signaled(pid, sig, _) => Some((pid, ChildExit::Signaled(sig))),
            _ => None,
        }
    }
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildExit::Exited(code) => write!(f, "exit code {code}"),
            ChildExit::Signaled(sig) => write!(f, "signal {sig}"),
        }
    }
}
