// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Change Router (C5): maps raw change batches to affected targets,
//! debounces and settles them per target, and hands off to the Build Queue
//! (C4). Per-target debounce/settle timers reuse the teacher's `Scheduler`
//! timer-bookkeeping shape (`set_timer`/`cancel_timer`/`fired_timers(now)`),
//! driven by a tick rather than one `tokio::time::sleep` task per target —
//! this keeps the Router synchronous internally and trivially testable with
//! a `FakeClock`.

use crate::pattern::PatternSet;
use parking_lot::Mutex;
use poltergeist_core::{Clock, Target, TargetName};
use poltergeist_engine::{BuildQueue, PriorityEngine};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("target already registered: {0}")]
    AlreadyRegistered(String),
    #[error(transparent)]
    Pattern(#[from] crate::pattern::PatternError),
}

/// Debounce/settle state machine for a single target. Mirrors spec.md
/// §4.5: new matching events always (re)start a debounce window; once a
/// debounce window elapses with no further events, a settling window opens;
/// once *that* elapses with no further events, the Router fires
/// `Queue.OnFileChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Debouncing,
    Settling,
}

struct RoutedTarget {
    patterns: PatternSet,
    debounce_interval_ms: i64,
    settling_delay_ms: i64,
    pending_paths: HashSet<String>,
    phase_deadline_ms: Option<(Phase, i64)>,
    dirty: bool,
    dirty_paths: HashSet<String>,
}

pub struct Router {
    clock: Arc<dyn Clock>,
    queue: Arc<BuildQueue>,
    priority_engine: Arc<PriorityEngine>,
    targets: Mutex<HashMap<TargetName, RoutedTarget>>,
    tick_interval: Duration,
    run_token: Mutex<Option<CancellationToken>>,
    tick_handle: Mutex<Option<JoinHandle<()>>>,
    completion_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Router {
    pub fn new(
        clock: Arc<dyn Clock>,
        queue: Arc<BuildQueue>,
        priority_engine: Arc<PriorityEngine>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            clock,
            queue,
            priority_engine,
            targets: Mutex::new(HashMap::new()),
            tick_interval,
            run_token: Mutex::new(None),
            tick_handle: Mutex::new(None),
            completion_handle: Mutex::new(None),
        }
    }

    /// Compiles and registers a target's watch patterns. Idempotent re-calls
    /// replace the prior pattern set and timer configuration but do not
    /// disturb in-flight debounce/settle state.
    pub fn register_target(&self, target: &Target) -> Result<(), RouterError> {
        let patterns = PatternSet::compile(&target.watch_patterns)?;
        let mut targets = self.targets.lock();
        let entry = targets
            .entry(target.name.clone())
            .or_insert_with(|| RoutedTarget {
                patterns: patterns.clone(),
                debounce_interval_ms: target.debounce_interval_ms as i64,
                settling_delay_ms: target.settling_delay_ms as i64,
                pending_paths: HashSet::new(),
                phase_deadline_ms: None,
                dirty: false,
                dirty_paths: HashSet::new(),
            });
        entry.patterns = patterns;
        entry.debounce_interval_ms = target.debounce_interval_ms as i64;
        entry.settling_delay_ms = target.settling_delay_ms as i64;
        Ok(())
    }

    /// Routes a raw change batch: for each registered target whose patterns
    /// match any changed path, records the change for analytics and applies
    /// the debounce/settle/dirty-bit state machine.
    pub fn on_changes(&self, paths: &[String]) {
        let now_ms = self.clock.now_ms();
        let mut targets = self.targets.lock();
        for (target_name, routed) in targets.iter_mut() {
            let matched: Vec<&String> = paths.iter().filter(|p| routed.patterns.matches(p)).collect();
            if matched.is_empty() {
                continue;
            }
            for path in &matched {
                self.priority_engine.record_file_change(target_name, path);
            }

            if self.queue.is_active(target_name) {
                routed.dirty = true;
                routed.dirty_paths.extend(matched.iter().map(|p| (*p).clone()));
                debug!(target = %target_name, "change observed while active; marking dirty");
                continue;
            }

            routed.pending_paths.extend(matched.into_iter().cloned());
            routed.phase_deadline_ms = Some((Phase::Debouncing, now_ms + routed.debounce_interval_ms));
        }
    }

    /// Advances all per-target timers against `now_ms`, transitioning
    /// Debouncing → Settling and firing `Queue.OnFileChanged` once Settling
    /// expires with no intervening events.
    fn tick(&self, now_ms: i64) {
        let mut to_fire: Vec<(TargetName, Vec<String>)> = Vec::new();
        {
            let mut targets = self.targets.lock();
            for (target_name, routed) in targets.iter_mut() {
                let Some((phase, deadline)) = routed.phase_deadline_ms else {
                    continue;
                };
                if now_ms < deadline {
                    continue;
                }
                match phase {
                    Phase::Debouncing => {
                        routed.phase_deadline_ms =
                            Some((Phase::Settling, now_ms + routed.settling_delay_ms));
                    }
                    Phase::Settling => {
                        routed.phase_deadline_ms = None;
                        let paths: Vec<String> = routed.pending_paths.drain().collect();
                        to_fire.push((target_name.clone(), paths));
                    }
                }
            }
        }
        for (target_name, paths) in to_fire {
            self.queue.on_file_changed(&paths, std::slice::from_ref(&target_name));
        }
    }

    /// Reacts to a target's active build finishing: if its dirty bit is
    /// set, clears it and re-enqueues immediately with freshly scored
    /// priority (spec.md §4.4 state machine: "on transition back to idle,
    /// if dirty, the Router immediately re-enqueues").
    fn on_build_finished(&self, target_name: &TargetName) {
        let paths = {
            let mut targets = self.targets.lock();
            let Some(routed) = targets.get_mut(target_name) else {
                return;
            };
            if !routed.dirty {
                return;
            }
            routed.dirty = false;
            routed.dirty_paths.drain().collect::<Vec<_>>()
        };
        debug!(target = %target_name, "dirty bit set; re-enqueuing after active build finished");
        self.queue.on_file_changed(&paths, std::slice::from_ref(target_name));
    }

    /// Starts the tick loop and the completion-listener loop. Both run
    /// until `root_cancel` fires.
    pub fn start(self: &Arc<Self>, root_cancel: CancellationToken) {
        *self.run_token.lock() = Some(root_cancel.clone());

        let router = Arc::clone(self);
        let tick_token = root_cancel.clone();
        let tick_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(router.tick_interval);
            loop {
                tokio::select! {
                    _ = tick_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let now_ms = router.clock.now_ms();
                        router.tick(now_ms);
                    }
                }
            }
        });
        *self.tick_handle.lock() = Some(tick_handle);

        let router = Arc::clone(self);
        let mut completions = self.queue.subscribe_completions();
        let completion_token = root_cancel;
        let completion_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = completion_token.cancelled() => break,
                    result = completions.recv() => {
                        match result {
                            Ok(target_name) => router.on_build_finished(&target_name),
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
        });
        *self.completion_handle.lock() = Some(completion_handle);
    }

    pub async fn stop(&self) {
        if let Some(token) = self.run_token.lock().take() {
            token.cancel();
        }
        if let Some(handle) = self.tick_handle.lock().take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.completion_handle.lock().take() {
            let _ = handle.await;
        }
    }

    /// Exposes whether `target_name`'s dirty bit is currently set, for
    /// tests.
    #[cfg(test)]
    fn is_dirty(&self, target_name: &TargetName) -> bool {
        self.targets
            .lock()
            .get(target_name)
            .map(|r| r.dirty)
            .unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
