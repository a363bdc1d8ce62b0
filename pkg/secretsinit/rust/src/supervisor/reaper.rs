// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::supervisor::process::ChildExit;
use anyhow::{Context, Result};
use log::{debug, error, info};
use nix::errno::Errno;
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use tokio::sync::oneshot;

/// Receivers fed by the reaping thread.
pub struct Reaper {
    /// Status of the tracked process. Closed without a value when the loop
    /// ends before the tracked process was reaped.
    pub exit: oneshot::Receiver<ChildExit>,
    /// Fires once no child processes are left.
    pub drained: oneshot::Receiver<()>,
}

/// Start reaping every child of this process on a dedicated thread.
///
/// Must be called after `tracked` has been spawned, otherwise the loop may
/// find no children and end immediately.
pub fn spawn(tracked: Pid) -> Result<Reaper> {
    let (exit_tx, exit) = oneshot::channel();
    let (drained_tx, drained) = oneshot::channel();
    std::thread::Builder::new()
        .name("reaper".to_string())
        .spawn(move || {
            reap_until_no_children(tracked, exit_tx);
            let _ = drained_tx.send(());
        })
        .context("failed to start reaper thread")?;
    Ok(Reaper { exit, drained })
}

fn reap_until_no_children(tracked: Pid, exit_tx: oneshot::Sender<ChildExit>) {
    let mut exit_tx = Some(exit_tx);
    loop {
        match waitpid(None::<Pid>, None) {
            Ok(status) => {
                let Some((pid, exit)) = ChildExit::from_wait_status(status) else {
                    continue;
                };
                if pid == tracked {
                    info!("command (pid={pid}) exited with {exit}");
                    if let Some(tx) = exit_tx.take() {
                        let _ = tx.send(exit);
                    }
                } else {
                    debug!("reaped orphaned process (pid={pid}, {exit})");
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                debug!("no child processes left");
                return;
            }
            Err(e) => {
                error!("waitpid failed: {e}");
                return;
            }
        }
    }
}
