// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Field-level patch applied by `StateStore::update`. Recognized keys are
//! `buildStatus`, `lastBuildTime`, `buildCount`, `failureCount`,
//! `lastError`; anything else lands in `metadata`, per `SPEC_FULL.md`
//! §4.1.

use chrono::{DateTime, Utc};
use poltergeist_core::BuildStatus;
use serde_json::Value;
use std::collections::HashMap;

/// A partial update to a `TargetState`. Increments to `build_count`/
/// `failure_count` are the caller's responsibility here — `UpdateBuildStatus`
/// is the one path that increments them automatically.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub build_status: Option<BuildStatus>,
    pub last_build_time: Option<DateTime<Utc>>,
    pub build_count: Option<u64>,
    pub failure_count: Option<u64>,
    pub last_error: Option<String>,
    pub metadata: HashMap<String, Value>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_build_status(mut self, status: BuildStatus) -> Self {
        self.build_status = Some(status);
        self
    }

    pub fn with_last_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
