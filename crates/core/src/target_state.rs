// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `TargetState`: the persisted, per-target record written by the State
//! Store (C1). Field names are bit-compatible with existing consumers —
//! see `SPEC_FULL.md` §6 for the JSON schema.

use crate::status::BuildStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetState {
    #[serde(rename = "targetName")]
    pub target_name: String,
    #[serde(rename = "processId")]
    pub process_id: u32,
    pub heartbeat: DateTime<Utc>,
    #[serde(rename = "buildStatus")]
    pub build_status: BuildStatus,
    #[serde(rename = "lastBuildTime")]
    pub last_build_time: Option<DateTime<Utc>>,
    #[serde(rename = "buildCount")]
    pub build_count: u64,
    #[serde(rename = "failureCount")]
    pub failure_count: u64,
    #[serde(rename = "lastError")]
    pub last_error: String,
    /// Free-form metadata set via `StatePatch::with_metadata`.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Top-level fields outside this schema, preserved verbatim across
    /// read/write so a newer writer's fields survive a round trip through
    /// an older one, per SPEC_FULL.md §6.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, Value>,
}

impl TargetState {
    /// A fresh record as written by `Initialize`.
    pub fn fresh(target_name: impl Into<String>, process_id: u32, now: DateTime<Utc>) -> Self {
        Self {
            target_name: target_name.into(),
            process_id,
            heartbeat: now,
            build_status: BuildStatus::Idle,
            last_build_time: None,
            build_count: 0,
            failure_count: 0,
            last_error: String::new(),
            metadata: HashMap::new(),
            unknown_fields: HashMap::new(),
        }
    }

    /// Invariant check: `build_count >= failure_count`, and a `succeeded`
    /// status must carry an empty `last_error`. Used by tests and by the
    /// State Store's self-checks; never called on the hot write path.
    pub fn invariants_hold(&self) -> bool {
        if self.build_count < self.failure_count {
            return false;
        }
        if self.build_status == BuildStatus::Succeeded && !self.last_error.is_empty() {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_idle_with_zeroed_counters() {
        let now = Utc::now();
        let state = TargetState::fresh("t", 42, now);
        assert_eq!(state.build_status, BuildStatus::Idle);
        assert_eq!(state.build_count, 0);
        assert_eq!(state.failure_count, 0);
        assert_eq!(state.last_error, "");
        assert!(state.invariants_hold());
    }

    #[test]
    fn json_roundtrip_preserves_unknown_fields() {
        let raw = serde_json::json!({
            "targetName": "t",
            "processId": 1,
            "heartbeat": "2024-01-01T00:00:00Z",
            "buildStatus": "idle",
            "lastBuildTime": null,
            "buildCount": 0,
            "failureCount": 0,
            "lastError": "",
            "metadata": {},
            "someFutureField": "kept"
        });
        let state: TargetState = serde_json::from_value(raw).unwrap();
        assert_eq!(
            state.unknown_fields.get("someFutureField"),
            Some(&serde_json::json!("kept"))
        );

        let out = serde_json::to_value(&state).unwrap();
        assert_eq!(out["someFutureField"], serde_json::json!("kept"));
        assert_eq!(out["targetName"], serde_json::json!("t"));
    }

    #[test]
    fn invariant_violated_when_build_count_below_failure_count() {
        let mut state = TargetState::fresh("t", 1, Utc::now());
        state.build_count = 1;
        state.failure_count = 2;
        assert!(!state.invariants_hold());
    }
}
