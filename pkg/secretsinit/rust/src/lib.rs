// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Container entrypoint that replaces secret references in its environment
//! with values fetched from a secret store, then runs a command as a
//! supervised child: signals are forwarded to the command's process group and
//! every descendant is reaped.

pub mod cli;
pub mod config;
pub mod env;
pub mod secrets;
pub mod supervisor;
