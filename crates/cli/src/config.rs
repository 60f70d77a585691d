// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project config discovery and loading.
//!
//! The Orchestrator itself never touches the filesystem for config (it is
//! handed an already-validated `OrchestratorConfig`); this module is the
//! thin, CLI-only layer that finds a `poltergeist.toml` (or `.json`) by
//! walking up from the current directory and parses it.

use anyhow::{Context, Result};
use poltergeist_core::OrchestratorConfig;
use std::path::{Path, PathBuf};

const CONFIG_NAMES: [&str; 2] = ["poltergeist.toml", "poltergeist.json"];

/// Walk up from `start` looking for a recognized config file name.
pub fn discover_config_path(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(d) = dir {
        for name in CONFIG_NAMES {
            let candidate = d.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        dir = d.parent();
    }
    None
}

/// Load and validate an `OrchestratorConfig` from an explicit path (or by
/// discovering one starting at the current directory).
pub fn load(explicit_path: Option<&Path>) -> Result<(PathBuf, OrchestratorConfig)> {
    let cwd = std::env::current_dir().context("cannot read current directory")?;
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => discover_config_path(&cwd).ok_or_else(|| {
            anyhow::anyhow!(
                "no poltergeist.toml or poltergeist.json found in {} or its parents",
                cwd.display()
            )
        })?,
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => OrchestratorConfig::from_json(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?,
        _ => OrchestratorConfig::from_toml(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?,
    };

    config
        .validate()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;

    Ok((path, config))
}

/// Resolve `config.project_root` against the directory containing the
/// config file when it is relative.
pub fn resolve_project_root(config_path: &Path, config: &OrchestratorConfig) -> PathBuf {
    if config.project_root.is_absolute() {
        return config.project_root.clone();
    }
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    base.join(&config.project_root)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
