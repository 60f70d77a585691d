// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration types received by the orchestration core. Per
//! `SPEC_FULL.md` §9 ("Global/singleton state"), the core never reads
//! process-global state (CLI flags, cwd, env) directly — it is handed a
//! fully validated `OrchestratorConfig` at construction time. Parsing an
//! on-disk config file into this shape is an external, out-of-scope
//! concern; the `from_json`/`from_toml` helpers below exist only as a thin
//! convenience for the CLI binary.

use crate::target::Target;
use std::path::PathBuf;
use std::time::Duration;

/// Validated, in-memory configuration the Orchestrator is constructed with.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OrchestratorConfig {
    pub project_root: PathBuf,
    pub targets: Vec<Target>,
    #[serde(default)]
    pub parallelization: ParallelizationConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub router: RouterConfig,
}

/// Re-exported for call sites that only need one target's view of the
/// config, e.g. the CLI's `--target` filter.
pub use crate::target::Target as TargetConfig;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ParallelizationConfig {
    /// `P`: the maximum number of concurrent build workers.
    pub max_concurrent_builds: usize,
}

impl Default for ParallelizationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_builds: 4,
        }
    }
}

/// Tunables for the Priority Engine (C2), all overridable per
/// `SPEC_FULL.md` §4.2.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    pub focus_window_secs: u64,
    pub priority_decay_secs: u64,
    pub fast_build_threshold_secs: u64,
    pub slow_build_threshold_secs: u64,
    pub rolling_average_alpha: f64,
    pub build_timeout_multiplier: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            focus_window_secs: 300,
            priority_decay_secs: 1_800,
            fast_build_threshold_secs: 5,
            slow_build_threshold_secs: 30,
            rolling_average_alpha: 0.3,
            build_timeout_multiplier: 2.0,
        }
    }
}

impl EngineConfig {
    pub fn focus_window(&self) -> Duration {
        Duration::from_secs(self.focus_window_secs)
    }
    pub fn priority_decay(&self) -> Duration {
        Duration::from_secs(self.priority_decay_secs)
    }
}

/// Tunables for the Change Router (C5).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct RouterConfig {
    pub default_debounce_ms: u64,
    pub default_settling_ms: u64,
    /// How often the dispatcher/router tick runs; must be `<= 100ms` per
    /// `SPEC_FULL.md` §4.4.
    pub tick_interval_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_debounce_ms: 100,
            default_settling_ms: 1_000,
            tick_interval_ms: 50,
        }
    }
}

/// Errors surfaced while validating a config. `ConfigInvalid` is fatal at
/// start, per `SPEC_FULL.md` §7.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no enabled targets")]
    NoEnabledTargets,
    #[error("duplicate target name: {0}")]
    DuplicateTargetName(String),
    #[error("invalid target {name}: {source}")]
    InvalidTarget {
        name: String,
        #[source]
        source: crate::target::TargetValidationError,
    },
}

impl OrchestratorConfig {
    /// Pre-flight validation: no enabled targets, duplicate names, or
    /// individually-invalid targets are all `ConfigInvalid` per
    /// `SPEC_FULL.md` §7.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        let mut any_enabled = false;
        for target in &self.targets {
            if !seen.insert(target.name.as_str().to_string()) {
                return Err(ConfigError::DuplicateTargetName(
                    target.name.as_str().to_string(),
                ));
            }
            if target.enabled {
                any_enabled = true;
                target
                    .validate()
                    .map_err(|source| ConfigError::InvalidTarget {
                        name: target.name.as_str().to_string(),
                        source,
                    })?;
            }
        }
        if !any_enabled {
            return Err(ConfigError::NoEnabledTargets);
        }
        Ok(())
    }

    /// Convenience parser for a JSON-encoded config, used by the CLI.
    /// Parsing/schema concerns are otherwise out of scope for this crate.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Convenience parser for a TOML-encoded config, used by the CLI.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
