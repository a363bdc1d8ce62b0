// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Variables that would make a run depend on the host it executes on.
const SCRUBBED_ENV: &[&str] = &[
    "SECRETS_INIT_PROVIDER",
    "SECRETS_INIT_AWS_JSON_KEY",
    "SECRETS_INIT_FAILURE_POLICY",
    "SECRETS_INIT_MAX_CONCURRENT_FETCHES",
    "SECRETS_INIT_TIMEOUT",
    "SECRETS_INIT_DRAIN_TIMEOUT",
    "SECRETS_INIT_LOG_LEVEL",
    "SECRETS_INIT_GOOGLE_ENDPOINT",
    "GOOGLE_PROJECT",
    "GCE_METADATA_HOST",
    "GOOGLE_APPLICATION_CREDENTIALS",
    "CLOUDSDK_CONFIG",
];

/// Handle to a running secrets-init process.
pub struct SecretsInit {
    child: Child,
    stdout: Arc<Mutex<Vec<String>>>,
    logs: Arc<Mutex<Vec<String>>>,
    readers: Vec<JoinHandle<()>>,
}

impl SecretsInit {
    /// Start secrets-init with `args` and extra environment variables.
    pub fn start(args: &[&str], env: &[(&str, &str)]) -> Self {
        let bin = env!("CARGO_BIN_EXE_secrets-init");
        let mut cmd = Command::new(bin);
        for key in SCRUBBED_ENV {
            cmd.env_remove(key);
        }
        let mut child = cmd
            .args(args)
            .envs(env.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to start secrets-init");

        let stdout = Arc::new(Mutex::new(Vec::new()));
        let logs = Arc::new(Mutex::new(Vec::new()));
        let readers = vec![
            collect_lines(
                child.stdout.take().expect("failed to capture stdout"),
                Arc::clone(&stdout),
                "out",
            ),
            // simple_logger writes every level to stderr.
            collect_lines(
                child.stderr.take().expect("failed to capture stderr"),
                Arc::clone(&logs),
                "log",
            ),
        ];

        Self {
            child,
            stdout,
            logs,
            readers,
        }
    }

    pub fn pid(&self) -> Pid {
        Pid::from_raw(self.child.id() as i32)
    }

    /// Wait until a stdout line containing `pattern` appears, or timeout.
    pub fn wait_for_output(&self, pattern: &str, timeout: Duration) -> bool {
        wait_for_line(&self.stdout, pattern, timeout)
    }

    /// Wait until a log line containing `pattern` appears, or timeout.
    pub fn wait_for_log(&self, pattern: &str, timeout: Duration) -> bool {
        wait_for_line(&self.logs, pattern, timeout)
    }

    pub fn send_signal(&self, sig: Signal) {
        signal::kill(self.pid(), sig).expect("failed to signal secrets-init");
    }

    /// Wait for secrets-init to exit within `timeout`, killing it otherwise,
    /// then drain its output.
    pub fn wait_with_timeout(&mut self, timeout: Duration) -> ExitStatus {
        let deadline = Instant::now() + timeout;
        let status = loop {
            match self.child.try_wait().expect("failed to check status") {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    self.child.kill().ok();
                    let status = self.child.wait().expect("failed to wait on killed process");
                    panic!("secrets-init did not exit within {timeout:?} ({status})");
                }
                None => std::thread::sleep(Duration::from_millis(50)),
            }
        };
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        status
    }

    pub fn wait(&mut self) -> ExitStatus {
        self.wait_with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout.lock().unwrap().clone()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.logs.lock().unwrap().clone()
    }

    pub fn logs_contain(&self, pattern: &str) -> bool {
        self.logs.lock().unwrap().iter().any(|l| l.contains(pattern))
    }
}

impl Drop for SecretsInit {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Run secrets-init to completion.
pub fn run(args: &[&str], env: &[(&str, &str)]) -> (ExitStatus, SecretsInit) {
    let mut handle = SecretsInit::start(args, env);
    let status = handle.wait();
    (status, handle)
}

fn collect_lines(
    stream: impl Read + Send + 'static,
    sink: Arc<Mutex<Vec<String>>>,
    tag: &'static str,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            match line {
                Ok(l) => {
                    eprintln!("[secrets-init:{tag}] {l}");
                    sink.lock().unwrap().push(l);
                }
                Err(_) => break,
            }
        }
    })
}

fn wait_for_line(lines: &Mutex<Vec<String>>, pattern: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if lines.lock().unwrap().iter().any(|l| l.contains(pattern)) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Extract the number following `marker` in the first line containing it.
pub fn number_after(lines: &[String], marker: &str) -> Option<i32> {
    lines.iter().find_map(|l| {
        let start = l.find(marker)? + marker.len();
        let digits: String = l[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    })
}

/// Check if a PID is still alive.
pub fn pid_is_alive(pid: i32) -> bool {
    signal::kill(Pid::from_raw(pid), None).is_ok()
}
