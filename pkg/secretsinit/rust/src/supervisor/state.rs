// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Environment not resolved yet, nothing spawned.
    Idle,
    /// Spawning the command.
    Starting,
    /// Command is alive; signals are forwarded and descendants reaped.
    Running,
    /// Command exited or could not be started.
    Terminated,
}

impl SupervisorState {
    pub(crate) fn can_transition_to(self, next: SupervisorState) -> bool {
        use SupervisorState::*;
        matches!(
            (self, next),
            (Idle, Starting) | (Starting, Running) | (Starting, Terminated) | (Running, Terminated)
        )
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorState::Idle => write!(f, "idle"),
            SupervisorState::Starting => write!(f, "starting"),
            SupervisorState::Running => write!(f, "running"),
            SupervisorState::Terminated => write!(f, "terminated"),
        }
    }
}
