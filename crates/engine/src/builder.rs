// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Builder Handle (C3): an opaque, per-target build invoker. The core
//! treats `Build` errors as opaque strings — it never inspects target kind
//! or builder internals. See `SPEC_FULL.md` §4.3.

use async_trait::async_trait;
use poltergeist_core::Target;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of a single build attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    /// Build failed with an opaque, human-readable message.
    Failure(String),
    /// Build was cancelled before completion; distinct from `Failure` so
    /// the Queue can record `cancelled` without incrementing
    /// `failure_count`.
    Cancelled,
}

/// An opaque error from `Builder::validate`/`clean`. `Build` itself returns
/// a `BuildOutcome` rather than a `Result`, since a failed build is not an
/// exceptional condition for the orchestrator — it's an expected outcome
/// recorded verbatim into `last_error`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct BuilderError(pub String);

/// Per-target build capability, exposed to the Build Queue. Implementors
/// must honor `cancel_token` promptly inside `build`.
#[async_trait]
pub trait Builder: Send + Sync + 'static {
    /// Called once at registration.
    async fn validate(&self) -> Result<(), BuilderError>;

    /// Runs the build. Must observe `cancel_token`: a build that keeps
    /// running past cancellation is killed by the caller once the bounded
    /// drain timeout elapses.
    async fn build(
        &self,
        cancel_token: CancellationToken,
        changed_files: &[String],
    ) -> BuildOutcome;

    async fn clean(&self) -> Result<(), BuilderError> {
        Ok(())
    }

    fn target(&self) -> &Target;

    /// Duration of this handle's most recently completed build, per
    /// `spec.md` §4.3 `GetLastBuildTime`. `None` until at least one
    /// non-cancelled build has completed.
    fn last_build_time(&self) -> Option<Duration>;

    /// Laplace-smoothed success rate across builds this handle has run, per
    /// `spec.md` §4.3 `GetSuccessRate`. `poltergeist_core::TargetPriority`
    /// already implements this smoothing; implementors track their own
    /// build history through it.
    fn success_rate(&self) -> f64;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex as SyncMutex;
    use poltergeist_core::TargetPriority;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    /// Deterministic, in-memory `Builder` for queue/engine tests. Each call
    /// to `build` pops the next scripted outcome (or repeats the last one
    /// if the script is exhausted), after sleeping `delay`.
    pub struct FakeBuilder {
        target: Target,
        delay: Duration,
        outcomes: Mutex<Vec<BuildOutcome>>,
        call_count: AtomicUsize,
        metrics: SyncMutex<TargetPriority>,
    }

    impl FakeBuilder {
        pub fn new(target: Target) -> Self {
            Self {
                target,
                delay: Duration::from_millis(0),
                outcomes: Mutex::new(vec![BuildOutcome::Success]),
                call_count: AtomicUsize::new(0),
                metrics: SyncMutex::new(TargetPriority::new()),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn with_outcomes(self, outcomes: Vec<BuildOutcome>) -> Self {
            *self.outcomes.try_lock().expect("uncontended at setup") = outcomes;
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Builder for FakeBuilder {
        async fn validate(&self) -> Result<(), BuilderError> {
            Ok(())
        }

        async fn build(
            &self,
            cancel_token: CancellationToken,
            _changed_files: &[String],
        ) -> BuildOutcome {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            let started = std::time::Instant::now();
            tokio::select! {
                _ = cancel_token.cancelled() => return BuildOutcome::Cancelled,
                _ = tokio::time::sleep(self.delay) => {}
            }
            let outcome = {
                let mut outcomes = self.outcomes.lock().await;
                if outcomes.len() > 1 {
                    outcomes.remove(0)
                } else {
                    outcomes
                        .first()
                        .cloned()
                        .unwrap_or(BuildOutcome::Success)
                }
            };
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
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
