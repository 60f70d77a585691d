// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ShellCommandBuilder`: the one concrete `Builder` (C3) this repo ships.
//! Runs a target's `build_command` template through
//! `tokio::process::Command::new("sh").arg("-c")`, honoring cancellation by
//! racing `child.wait()` against the cancel token and killing the child on
//! cancellation. Mirrors the subprocess-spawning discipline in
//! `oj-shell::exec` (spawn via `tokio::process::Command`, async wait,
//! structured exit-code/stderr capture) without importing the full
//! shell-AST parser, which has no counterpart in this spec.

use async_trait::async_trait;
use parking_lot::Mutex;
use poltergeist_core::{Target, TargetPriority};
use poltergeist_engine::{BuildOutcome, Builder, BuilderError};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

/// Default ceiling on how long a build is allowed to run after cancellation
/// before it is forcibly killed; mirrors the teacher's per-operation
/// subprocess timeouts in `oj-adapters::subprocess`.
pub const KILL_GRACE: Duration = Duration::from_secs(5);

pub struct ShellCommandBuilder {
    target: Target,
    /// This handle's own `GetLastBuildTime`/`GetSuccessRate` bookkeeping
    /// (spec.md §4.3), tracked independently of the Priority Engine's (C2)
    /// copy — `TargetPriority` is the same bounded, no-I/O value type both
    /// components use.
    metrics: Mutex<TargetPriority>,
}

impl ShellCommandBuilder {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            metrics: Mutex::new(TargetPriority::new()),
        }
    }
}

#[async_trait]
impl Builder for ShellCommandBuilder {
    async fn validate(&self) -> Result<(), BuilderError> {
        if self.target.build_command.trim().is_empty() {
            return Err(BuilderError("build command is empty".to_string()));
        }
        Ok(())
    }

    async fn build(&self, cancel_token: CancellationToken, changed_files: &[String]) -> BuildOutcome {
        let started = Instant::now();
        let mut command = tokio::process::Command::new("sh");
        command
            .arg("-c")
            .arg(&self.target.build_command)
            .envs(&self.target.environment)
            .env("POLTERGEIST_TARGET", self.target.name.as_str())
            .env("POLTERGEIST_CHANGED_FILES", changed_files.join(":"))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return BuildOutcome::Failure(format!("failed to spawn build command: {e}")),
        };
        let mut stderr_pipe = child.stderr.take();
        // Drain stdout in the background so a chatty build command can't
        // deadlock on a full pipe buffer while we wait for exit.
        if let Some(mut stdout) = child.stdout.take() {
            tokio::spawn(async move {
                let mut sink = Vec::new();
                let _ = stdout.read_to_end(&mut sink).await;
            });
        }

        let outcome = tokio::select! {
            _ = cancel_token.cancelled() => {
                let _ = tokio::time::timeout(KILL_GRACE, child.kill()).await;
                BuildOutcome::Cancelled
            }
            status = child.wait() => {
                match status {
                    Ok(status) if status.success() => BuildOutcome::Success,
                    Ok(status) => {
                        let mut stderr_buf = String::new();
                        if let Some(mut stderr) = stderr_pipe.take() {
                            let _ = stderr.read_to_string(&mut stderr_buf).await;
                        }
                        BuildOutcome::Failure(format!("{status}: {}", stderr_buf.trim()))
                    }
                    Err(e) => BuildOutcome::Failure(format!("build command failed: {e}")),
                }
            }
        };

        // Cancellation is non-incrementing, per SPEC_FULL.md §4.3.
        if !matches!(outcome, BuildOutcome::Cancelled) {
            let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
            let success = matches!(outcome, BuildOutcome::Success);
            self.metrics.lock().record_build(duration_ms, success, 0.3);
        }

        outcome
    }

    fn target(&self) -> &Target {
        &self.target
    }

    fn last_build_time(&self) -> Option<Duration> {
        let metrics = self.metrics.lock();
        if metrics.attempts == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(metrics.avg_build_duration_ms / 1000.0))
        }
    }

    fn success_rate(&self) -> f64 {
        self.metrics.lock().success_rate()
    }
}

#[cfg(test)]
#[path = "shell_builder_tests.rs"]
mod tests;
