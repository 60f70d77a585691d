// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target identity: the unit of scheduling.

use crate::id::TargetName;
use std::collections::HashMap;

/// Target kind tags. The orchestration core is kind-agnostic: kind only
/// affects how an external `BuilderFactory` assembles the build command and
/// what artifact is produced, never how the target is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    Executable,
    Library,
    AppBundle,
    ContainerImage,
    Test,
    CMake,
    CMakeExecutable,
    CMakeLibrary,
    Custom,
}

/// A named, watchable, buildable unit. See `SPEC_FULL.md` §3 for invariants.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Target {
    pub name: TargetName,
    pub kind: TargetKind,
    /// Ordered glob patterns; order is preserved for diagnostics but does
    /// not affect matching (C8 treats them as a set).
    pub watch_patterns: Vec<String>,
    /// Opaque command template handed to the `Builder` implementation.
    pub build_command: String,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_interval_ms: u64,
    #[serde(default = "default_settling_ms")]
    pub settling_delay_ms: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_debounce_ms() -> u64 {
    100
}
fn default_settling_ms() -> u64 {
    1_000
}
fn default_enabled() -> bool {
    true
}

impl Target {
    /// Validation applied when a target is registered. Distinct from the
    /// Builder's own `Validate()` (which may check toolchain availability,
    /// etc.) — this only checks structural invariants this crate owns.
    pub fn validate(&self) -> Result<(), TargetValidationError> {
        if self.watch_patterns.is_empty() {
            return Err(TargetValidationError::NoWatchPatterns);
        }
        if self.build_command.trim().is_empty() {
            return Err(TargetValidationError::EmptyBuildCommand);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TargetValidationError {
    #[error("target has no watch patterns")]
    NoWatchPatterns,
    #[error("target has an empty build command")]
    EmptyBuildCommand,
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
