// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Orchestrator (C6): wires the State Store (C1), Priority Engine (C2),
//! Builder (C3), Build Queue (C4), and Change Router (C5) together, owns
//! the process-wide cancellation root, and surfaces a point-in-time status
//! snapshot. See `SPEC_FULL.md` §4.6.

use crate::error::OrchestratorError;
use crate::pidlock::PidLock;
use chrono::{DateTime, Utc};
use notify::RecommendedWatcher;
use parking_lot::Mutex;
use poltergeist_adapters::{watch_recursive, Router, ShellCommandBuilder};
use poltergeist_core::{BuildStatus, Clock, OrchestratorConfig, Target, TargetState};
use poltergeist_engine::{BuildQueue, Builder, Notifier, PriorityEngine};
use poltergeist_storage::StateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default bound on how long shutdown waits for the Queue to drain before
/// giving up on a graceful stop, per `SPEC_FULL.md` §4.6.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// A point-in-time snapshot, per `Status()` in `SPEC_FULL.md` §4.6.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub process_id: u32,
    pub start_time: DateTime<Utc>,
    pub active_count: usize,
    pub queued_count: usize,
    pub targets: Vec<TargetState>,
}

pub struct Orchestrator {
    state_store: Arc<StateStore>,
    queue: Arc<BuildQueue>,
    router: Arc<Router>,
    clock: Arc<dyn Clock>,
    process_id: u32,
    start_time: DateTime<Utc>,
    root_cancel: CancellationToken,
    heartbeat_cancel: CancellationToken,
    heartbeat_handle: Mutex<Option<JoinHandle<()>>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    forward_handle: Mutex<Option<JoinHandle<()>>>,
    pid_lock: Mutex<Option<PidLock>>,
}

impl Orchestrator {
    /// `Start(config, project_root, target_filter?)`: the five-step
    /// startup sequence from `SPEC_FULL.md` §4.6.
    pub async fn start(
        config: OrchestratorConfig,
        target_filter: Option<&[String]>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, OrchestratorError> {
        config.validate()?;

        let pid_lock_path = config.project_root.join(".poltergeist").join("daemon.pid");
        let pid_lock = PidLock::acquire(&pid_lock_path).map_err(|source| OrchestratorError::LockFailed {
            path: pid_lock_path,
            source,
        })?;

        // 1. Create State Store; start its heartbeat.
        let state_store = Arc::new(StateStore::open(&config.project_root, clock.clone())?);
        let heartbeat_cancel = CancellationToken::new();
        let heartbeat_handle = state_store.start_heartbeat(heartbeat_cancel.clone());

        // 2. Create Priority Engine and Build Queue.
        let priority_engine = Arc::new(PriorityEngine::new(clock.clone(), config.engine));
        let tick_interval = Duration::from_millis(config.router.tick_interval_ms.max(1));
        let queue = Arc::new(BuildQueue::new(
            config.parallelization.max_concurrent_builds,
            priority_engine.clone(),
            state_store.clone(),
            clock.clone(),
            notifier,
            tick_interval,
        ));

        // 3. For each enabled (and filtered) target, construct a Builder
        // Handle and RegisterTarget.
        let router = Arc::new(Router::new(
            clock.clone(),
            queue.clone(),
            priority_engine,
            tick_interval,
        ));
        for target in selected_targets(&config.targets, target_filter) {
            match register_target(target, &state_store, &queue, &router).await {
                Ok(()) => {}
                Err(OrchestratorError::TargetValidation { target, source }) => {
                    warn!(target, error = %source, "target failed validation; skipping for this run");
                }
                Err(e) => return Err(e),
            }
        }

        // 4. Wire the Router to the external watcher subscription.
        let (watcher, mut change_rx) =
            watch_recursive(&config.project_root).map_err(|source| OrchestratorError::Watch {
                path: config.project_root.clone(),
                source,
            })?;
        let router_for_forward = router.clone();
        let forward_handle = tokio::spawn(async move {
            while let Some(batch) = change_rx.recv().await {
                router_for_forward.on_changes(&batch.paths);
            }
        });

        // 5. Start the Queue dispatcher (and the Router's tick/completion
        // loops, which share the same cancellation root).
        let root_cancel = CancellationToken::new();
        queue.start(root_cancel.clone());
        router.start(root_cancel.clone());

        let process_id = std::process::id();
        let start_time = clock.now_utc();
        info!(process_id, targets = queue.active_count(), "orchestrator started");

        Ok(Arc::new(Self {
            state_store,
            queue,
            router,
            clock,
            process_id,
            start_time,
            root_cancel,
            heartbeat_cancel,
            heartbeat_handle: Mutex::new(Some(heartbeat_handle)),
            watcher: Mutex::new(Some(watcher)),
            forward_handle: Mutex::new(Some(forward_handle)),
            pid_lock: Mutex::new(Some(pid_lock)),
        }))
    }

    /// The four-step shutdown sequence from `SPEC_FULL.md` §4.6: cancel the
    /// root, wait for the Queue to drain (bounded), mark owned states idle,
    /// then stop the heartbeat.
    pub async fn shutdown(&self, drain_timeout: Duration) {
        info!("shutting down orchestrator");

        // 1. Cancel the root; propagates to active builders and the
        // dispatcher/router ticks.
        self.root_cancel.cancel();

        // Stop watching for new changes immediately; dropping the watcher
        // closes the forwarding channel so the forward task exits.
        if let Some(watcher) = self.watcher.lock().take() {
            drop(watcher);
        }
        if let Some(handle) = self.forward_handle.lock().take() {
            let _ = handle.await;
        }

        // 2. Wait for the Queue to drain with a bounded timeout.
        let deadline = tokio::time::Instant::now() + drain_timeout;
        while self.queue.size() > 0 || self.queue.active_count() > 0 {
            if tokio::time::Instant::now() >= deadline {
                warn!("queue did not drain before shutdown timeout; proceeding anyway");
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.router.stop().await;
        self.queue.stop().await;

        // 3. Mark all owned TargetStates idle via State Store Cleanup.
        self.state_store.cleanup();

        // 4. Stop heartbeat.
        self.heartbeat_cancel.cancel();
        if let Some(handle) = self.heartbeat_handle.lock().take() {
            let _ = handle.await;
        }

        // Release the process-level daemon.pid lock.
        self.pid_lock.lock().take();

        info!("orchestrator shutdown complete");
    }

    /// `Status()`: a point-in-time snapshot.
    pub fn status(&self) -> StatusSnapshot {
        let targets = self.state_store.discover_states().unwrap_or_else(|e| {
            warn!(error = %e, "failed to enumerate target states for status");
            Vec::new()
        });
        StatusSnapshot {
            running: true,
            process_id: self.process_id,
            start_time: self.start_time,
            active_count: self.queue.active_count(),
            queued_count: self.queue.size(),
            targets,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

fn selected_targets<'a>(
    targets: &'a [Target],
    target_filter: Option<&[String]>,
) -> impl Iterator<Item = &'a Target> {
    targets.iter().filter(move |t| {
        t.enabled
            && target_filter
                .map(|names| names.iter().any(|n| n == t.name.as_str()))
                .unwrap_or(true)
    })
}

async fn register_target(
    target: &Target,
    state_store: &Arc<StateStore>,
    queue: &Arc<BuildQueue>,
    router: &Arc<Router>,
) -> Result<(), OrchestratorError> {
    let builder = Arc::new(ShellCommandBuilder::new(target.clone()));
    builder
        .validate()
        .await
        .map_err(|source| OrchestratorError::TargetValidation {
            target: target.name.as_str().to_string(),
            source,
        })?;

    let sanitized = target.name.sanitized();
    state_store.initialize(&sanitized, target.name.as_str(), BuildStatus::Idle)?;
    queue.register_target(target.name.clone(), builder);
    router.register_target(target)?;
    Ok(())
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
