// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Signal capture and process group forwarding.
//!
//! Every catchable signal is fed into one bounded queue. Until the command is
//! running the queue only serves to cancel resolution; afterwards a single
//! task drains it and re-sends each signal to the command's process group.

use anyhow::Result;
use log::{debug, trace, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::signal::unix::{SignalKind, signal as register};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::StreamMap;
use tokio_stream::wrappers::SignalStream;

pub const QUEUE_CAPACITY: usize = 32;

/// Signals that are never handled: uncatchable ones and synchronous faults
/// that must keep their default action.
fn is_uncaught(sig: Signal) -> bool {
    matches!(
        sig,
        Signal::SIGKILL
            | Signal::SIGSTOP
            | Signal::SIGSEGV
            | Signal::SIGBUS
            | Signal::SIGILL
            | Signal::SIGFPE
            | Signal::SIGTRAP
    )
}

/// Received but not passed on to the command.
pub fn is_suppressed(sig: Signal) -> bool {
    matches!(sig, Signal::SIGCHLD | Signal::SIGURG)
}

/// Signals that abort secret resolution.
pub fn is_shutdown(sig: Signal) -> bool {
    matches!(
        sig,
        Signal::SIGTERM | Signal::SIGINT | Signal::SIGQUIT | Signal::SIGHUP
    )
}

pub fn catchable_signals() -> impl Iterator<Item = Signal> {
    Signal::iterator().filter(|&sig| !is_uncaught(sig))
}

/// Install handlers for every catchable signal and return the queue they feed.
///
/// Once installed, handled signals no longer have their default effect on
/// this process.
pub fn listen_all() -> Result<mpsc::Receiver<Signal>> {
    let mut streams = StreamMap::new();
    for sig in catchable_signals() {
        match register(SignalKind::from_raw(sig as i32)) {
            Ok(stream) => {
                streams.insert(sig, SignalStream::new(stream));
            }
            Err(e) => warn!("cannot handle {sig}: {e}"),
        }
    }
    debug!("listening for {} signal(s)", streams.len());

    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    tokio::spawn(async move {
        while let Some((sig, ())) = streams.next().await {
            if tx.send(sig).await.is_err() {
                break;
            }
        }
    });
    Ok(rx)
}

/// Wait for a signal that should cancel resolution, dropping the others since
/// there is no command to receive them yet.
pub async fn next_shutdown_signal(rx: &mut mpsc::Receiver<Signal>) -> Signal {
    while let Some(sig) = rx.recv().await {
        if is_shutdown(sig) {
            return sig;
        }
        if !is_suppressed(sig) {
            debug!("dropping {sig}: command not started yet");
        }
    }
    std::future::pending().await
}

/// Re-send every queued signal to the process group `pgid` until the queue
/// closes.
pub async fn forward_signals(mut rx: mpsc::Receiver<Signal>, pgid: Pid) {
    let target = Pid::from_raw(-pgid.as_raw());
    while let Some(sig) = rx.recv().await {
        if is_suppressed(sig) {
            trace!("not forwarding {sig}");
            continue;
        }
        debug!("forwarding {sig} to process group {pgid}");
        if let Err(e) = signal::kill(target, sig) {
            warn!("failed to forward {sig} to process group {pgid}: {e}");
        }
    }
}
