// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Priority Engine (C2): scores queued build requests from learned,
//! per-target metrics. See `SPEC_FULL.md` §4.2 for the scoring model; the
//! data these scores are computed from lives in
//! `poltergeist_core::priority::TargetPriority`.

use parking_lot::Mutex;
use poltergeist_core::{Clock, EngineConfig, TargetName, TargetPriority};
use std::collections::HashMap;
use std::sync::Arc;

/// Learns per-target build metrics and scores incoming change batches.
/// Internally guarded by a single mutex; every operation here is O(1) or
/// bounded by the 100-entry change ring, so the lock is never held across
/// I/O.
pub struct PriorityEngine {
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    targets: Mutex<HashMap<TargetName, TargetPriority>>,
}

impl PriorityEngine {
    pub fn new(clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            clock,
            config,
            targets: Mutex::new(HashMap::new()),
        }
    }

    /// Computes a priority score in `[0, 100]` for `target_name`, given the
    /// files that changed. Creates a fresh `TargetPriority` (base score 50)
    /// on first observation, per `SPEC_FULL.md` §9 ("explicit absence,
    /// score path returns 50 on first observation").
    pub fn calculate_priority(&self, target_name: &TargetName, now_ms: i64) -> f64 {
        let targets = self.targets.lock();
        let priority = match targets.get(target_name) {
            Some(p) => p,
            None => return 50.0,
        };

        let mut score: f64 = 50.0;

        // 1. Focus (recency): decays linearly from +30 at delta=0 to 0 at
        // the focus window boundary.
        if let Some(last_change) = priority.last_change_at_ms {
            let delta_ms = (now_ms - last_change).max(0) as f64;
            let window_ms = self.config.focus_window().as_millis() as f64;
            if delta_ms <= window_ms && window_ms > 0.0 {
                score += 30.0 * (1.0 - delta_ms / window_ms);
            }
        }

        // 2. Change frequency.
        let recent = priority
            .recent_change_count(now_ms, self.config.focus_window().as_millis() as i64)
            as f64;
        score += (2.0 * recent).min(20.0);

        // 3. Success history.
        score += (priority.success_rate() - 0.5) * 20.0;

        // 4. Build-time class.
        let fast_ms = (self.config.fast_build_threshold_secs * 1000) as f64;
        let slow_ms = (self.config.slow_build_threshold_secs * 1000) as f64;
        if priority.avg_build_duration_ms > 0.0 {
            if priority.avg_build_duration_ms < fast_ms {
                score += 10.0;
            } else if priority.avg_build_duration_ms > slow_ms {
                score -= 10.0;
            }
        }

        score.clamp(0.0, 100.0)
    }

    /// Records a file change against a target for scoring and analytics
    /// purposes (also purges decayed ring entries on the same pass).
    pub fn record_file_change(&self, target_name: &TargetName, path: &str) {
        let now_ms = self.clock.now_ms();
        let decay_ms = self.config.priority_decay().as_millis() as i64;
        let mut targets = self.targets.lock();
        let entry = targets.entry(target_name.clone()).or_default();
        entry.record_change(path.to_string(), now_ms);
        entry.decay(now_ms, decay_ms);
    }

    /// Updates rolling build-duration average and success rate after a
    /// build completes. Cancelled builds should not call this (see
    /// `SPEC_FULL.md` §4.3: cancellation is non-incrementing).
    pub fn update_target_metrics(&self, target_name: &TargetName, duration_ms: f64, success: bool) {
        let mut targets = self.targets.lock();
        let entry = targets.entry(target_name.clone()).or_default();
        entry.record_build(duration_ms, success, self.config.rolling_average_alpha);
    }

    /// Snapshot of a target's learned priority data, if any observation has
    /// happened yet.
    pub fn get_target_priority(&self, target_name: &TargetName) -> Option<TargetPriority> {
        self.targets.lock().get(target_name).cloned()
    }
}

#[cfg(test)]
#[path = "priority_tests.rs"]
mod tests;
