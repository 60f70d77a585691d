// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Build Queue (C4): a deduplicating, priority-ordered queue with a
//! bounded-parallel worker pool and cooperative cancellation. See
//! `SPEC_FULL.md` §4.4 for the full contract.

use crate::builder::{BuildOutcome, Builder};
use crate::priority::PriorityEngine;
use async_trait::async_trait;
use parking_lot::Mutex;
use poltergeist_core::{BuildRequest, Clock, TargetName};
use poltergeist_storage::{StatePatch, StateStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Abstract sink for build/queue lifecycle events (C7). All calls must be
/// fire-and-forget and must not block the caller beyond microseconds — the
/// Queue awaits them directly, so a slow Notifier implementation is a bug
/// in that implementation, not something the Queue guards against.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn build_start(&self, target: &str);
    async fn build_success(&self, target: &str, duration: Duration);
    async fn build_failure(&self, target: &str, error: &str);
    async fn queue_status(&self, active: usize, queued: usize);
    /// Soft-timeout hint; crossing it does not cancel the build. Not part
    /// of the minimal four-call spec.md interface, but a natural extension
    /// other Notifier implementations may ignore.
    async fn possibly_stuck(&self, _target: &str) {}
}

/// No-op `Notifier`, the default when no sink is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn build_start(&self, _target: &str) {}
    async fn build_success(&self, _target: &str, _duration: Duration) {}
    async fn build_failure(&self, _target: &str, _error: &str) {}
    async fn queue_status(&self, _active: usize, _queued: usize) {}
}

/// Recorded calls, for assertions in tests (`test-support` only).
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyEvent {
    BuildStart(String),
    BuildSuccess(String, Duration),
    BuildFailure(String, String),
    QueueStatus(usize, usize),
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeNotifier {
    pub events: Mutex<Vec<NotifyEvent>>,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Notifier for FakeNotifier {
    async fn build_start(&self, target: &str) {
        self.events
            .lock()
            .push(NotifyEvent::BuildStart(target.to_string()));
    }
    async fn build_success(&self, target: &str, duration: Duration) {
        self.events
            .lock()
            .push(NotifyEvent::BuildSuccess(target.to_string(), duration));
    }
    async fn build_failure(&self, target: &str, error: &str) {
        self.events.lock().push(NotifyEvent::BuildFailure(
            target.to_string(),
            error.to_string(),
        ));
    }
    async fn queue_status(&self, active: usize, queued: usize) {
        self.events
            .lock()
            .push(NotifyEvent::QueueStatus(active, queued));
    }
}

/// A target currently executing, tracked so at most one build per target
/// is ever active.
struct ActiveBuild {
    cancel: CancellationToken,
}

struct RegisteredTarget {
    builder: Arc<dyn Builder>,
}

struct Inner {
    /// Pending requests, kept sorted priority-descending with FIFO
    /// tie-break; a simple insertion sort is fine since queue depth is
    /// bounded by the number of registered targets.
    queue: Vec<BuildRequest>,
    active: HashMap<TargetName, ActiveBuild>,
    registered: HashMap<TargetName, RegisteredTarget>,
}

impl Inner {
    fn insert_sorted(&mut self, request: BuildRequest) {
        let pos = self
            .queue
            .iter()
            .position(|existing| {
                request.priority > existing.priority
                    || (request.priority == existing.priority
                        && request.enqueued_at_ms < existing.enqueued_at_ms)
            })
            .unwrap_or(self.queue.len());
        self.queue.insert(pos, request);
    }

    fn is_pending_or_active(&self, target_name: &TargetName) -> bool {
        self.active.contains_key(target_name)
            || self.queue.iter().any(|r| &r.target_name == target_name)
    }
}

pub struct BuildQueue {
    inner: Mutex<Inner>,
    parallelism: usize,
    priority_engine: Arc<PriorityEngine>,
    state_store: Arc<StateStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    completion_tx: broadcast::Sender<TargetName>,
    tick_interval: Duration,
    run_token: Mutex<Option<CancellationToken>>,
    dispatcher_handle: Mutex<Option<JoinHandle<()>>>,
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BuildQueue {
    pub fn new(
        parallelism: usize,
        priority_engine: Arc<PriorityEngine>,
        state_store: Arc<StateStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        tick_interval: Duration,
    ) -> Self {
        let (completion_tx, _rx) = broadcast::channel(256);
        Self {
            inner: Mutex::new(Inner {
                queue: Vec::new(),
                active: HashMap::new(),
                registered: HashMap::new(),
            }),
            parallelism: parallelism.max(1),
            priority_engine,
            state_store,
            clock,
            notifier,
            completion_tx,
            tick_interval,
            run_token: Mutex::new(None),
            dispatcher_handle: Mutex::new(None),
            worker_handles: Mutex::new(Vec::new()),
        }
    }

    /// A build-completion feed for the Change Router's dirty-bit handoff:
    /// fires the target name once its active build finishes (success,
    /// failure, or cancellation), so the Router can re-enqueue if its
    /// dirty bit is set.
    pub fn subscribe_completions(&self) -> broadcast::Receiver<TargetName> {
        self.completion_tx.subscribe()
    }

    /// Idempotent: re-registering a target replaces its builder handle.
    pub fn register_target(&self, target_name: TargetName, builder: Arc<dyn Builder>) {
        self.inner
            .lock()
            .registered
            .insert(target_name, RegisteredTarget { builder });
    }

    pub fn is_registered(&self, target_name: &TargetName) -> bool {
        self.inner.lock().registered.contains_key(target_name)
    }

    /// Routes a change batch into the queue. For each affected target
    /// already queued or active, the event is coalesced (dropped) rather
    /// than enqueuing a duplicate request.
    pub fn on_file_changed(&self, files: &[String], affected_targets: &[TargetName]) {
        let now_ms = self.clock.now_ms();
        let mut inserted = false;
        {
            let mut inner = self.inner.lock();
            for target_name in affected_targets {
                if inner.is_pending_or_active(target_name) {
                    debug!(target = %target_name, "coalescing change into existing request");
                    continue;
                }
                let priority = self.priority_engine.calculate_priority(target_name, now_ms);
                let request =
                    BuildRequest::new(target_name.clone(), priority, now_ms, files.to_vec());
                inner.insert_sorted(request);
                inserted = true;
            }
        }
        if inserted {
            self.emit_queue_status();
        }
    }

    /// Manual enqueue, for admin paths and tests.
    pub fn enqueue(&self, request: BuildRequest) {
        self.inner.lock().insert_sorted(request);
    }

    pub fn dequeue(&self) -> Option<BuildRequest> {
        let mut inner = self.inner.lock();
        if inner.queue.is_empty() {
            None
        } else {
            Some(inner.queue.remove(0))
        }
    }

    pub fn peek(&self) -> Option<BuildRequest> {
        self.inner.lock().queue.first().map(clone_request)
    }

    pub fn size(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active.len()
    }

    /// Whether `target_name` currently has a build in flight. Used by the
    /// Change Router's dirty-bit handoff (C5) to decide whether an incoming
    /// change should enqueue directly or merely mark the target dirty.
    pub fn is_active(&self, target_name: &TargetName) -> bool {
        self.inner.lock().active.contains_key(target_name)
    }

    /// Drops pending requests only; active builds continue running.
    pub fn clear(&self) {
        self.inner.lock().queue.clear();
    }

    fn emit_queue_status(&self) {
        let (active, queued) = {
            let inner = self.inner.lock();
            (inner.active.len(), inner.queue.len())
        };
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            notifier.queue_status(active, queued).await;
        });
    }

    /// Launches the dispatcher: polls at `tick_interval` and, while
    /// `|A| < P` and the queue is non-empty, pops the highest-priority
    /// request and spawns a worker for it.
    pub fn start(self: &Arc<Self>, root_cancel: CancellationToken) {
        *self.run_token.lock() = Some(root_cancel.clone());
        let queue = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(queue.tick_interval);
            loop {
                tokio::select! {
                    _ = root_cancel.cancelled() => break,
                    _ = ticker.tick() => queue.dispatch_ready(&root_cancel),
                }
            }
        });
        *self.dispatcher_handle.lock() = Some(handle);
    }

    fn dispatch_ready(self: &Arc<Self>, root_cancel: &CancellationToken) {
        loop {
            let (target_name, builder, request) = {
                let mut inner = self.inner.lock();
                if inner.active.len() >= self.parallelism {
                    return;
                }
                let Some(pos) = inner.queue.first().map(|_| 0usize) else {
                    return;
                };
                let request = inner.queue.remove(pos);
                let Some(registered) = inner.registered.get(&request.target_name) else {
                    // No builder registered (e.g. target disabled mid-run);
                    // drop the request rather than spawn a dead worker.
                    warn!(target = %request.target_name, "dropping request for unregistered target");
                    continue;
                };
                let builder = Arc::clone(&registered.builder);
                let cancel = root_cancel.child_token();
                inner
                    .active
                    .insert(request.target_name.clone(), ActiveBuild { cancel });
                (request.target_name.clone(), builder, request)
            };
            let queue = Arc::clone(self);
            let handle = tokio::spawn(async move { queue.run_worker(target_name, builder, request).await });
            self.worker_handles.lock().push(handle);
        }
    }

    async fn run_worker(
        self: Arc<Self>,
        target_name: TargetName,
        builder: Arc<dyn Builder>,
        request: BuildRequest,
    ) {
        let cancel = {
            let inner = self.inner.lock();
            inner
                .active
                .get(&target_name)
                .map(|a| a.cancel.clone())
                .unwrap_or_default()
        };

        self.notifier.build_start(target_name.as_str()).await;

        let start_ms = self.clock.now_ms();
        let outcome = builder.build(cancel, &request.triggering_files).await;
        let duration_ms = (self.clock.now_ms() - start_ms).max(0) as f64;
        let duration = Duration::from_millis(duration_ms as u64);

        match &outcome {
            BuildOutcome::Success => {
                self.priority_engine
                    .update_target_metrics(&target_name, duration_ms, true);
                self.notifier
                    .build_success(target_name.as_str(), duration)
                    .await;
            }
            BuildOutcome::Failure(err) => {
                self.priority_engine
                    .update_target_metrics(&target_name, duration_ms, false);
                self.notifier
                    .build_failure(target_name.as_str(), err)
                    .await;
            }
            BuildOutcome::Cancelled => {
                // Cancellation does not update build-duration/success-rate
                // metrics and is not reported through the four-call
                // Notifier interface, per SPEC_FULL.md §4.3/§7.
            }
        }

        let sanitized = target_name.sanitized();
        let patch_result = match &outcome {
            BuildOutcome::Success => self.state_store.update_build_status(
                &sanitized,
                poltergeist_core::BuildStatus::Succeeded,
                None,
            ),
            BuildOutcome::Failure(err) => self.state_store.update_build_status(
                &sanitized,
                poltergeist_core::BuildStatus::Failed,
                Some(err.clone()),
            ),
            BuildOutcome::Cancelled => self.state_store.update_build_status(
                &sanitized,
                poltergeist_core::BuildStatus::Cancelled,
                None,
            ),
        };
        if let Err(e) = patch_result {
            warn!(target = %target_name, error = %e, "failed to persist build status");
        }

        self.inner.lock().active.remove(&target_name);
        let _ = self.completion_tx.send(target_name.clone());
        info!(target = %target_name, ?outcome, duration_ms, "build finished");
        self.emit_queue_status();
    }

    /// Signals cancellation and waits for the dispatcher and all in-flight
    /// workers to exit.
    pub async fn stop(&self) {
        if let Some(token) = self.run_token.lock().take() {
            token.cancel();
        }
        if let Some(handle) = self.dispatcher_handle.lock().take() {
            let _ = handle.await;
        }
        let handles: Vec<_> = std::mem::take(&mut *self.worker_handles.lock());
        for handle in handles {
            let _ = handle.await;
        }
    }
}

fn clone_request(request: &BuildRequest) -> BuildRequest {
    BuildRequest {
        id: request.id,
        target_name: request.target_name.clone(),
        priority: request.priority,
        enqueued_at_ms: request.enqueued_at_ms,
        triggering_files: request.triggering_files.clone(),
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
