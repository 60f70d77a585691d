// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeist watch` — start the Orchestrator in the background.

use crate::{config, daemon_process};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

const START_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(clap::Args)]
pub struct WatchArgs {
    /// Only watch these targets (repeatable); default is every enabled target.
    #[arg(long = "target")]
    pub targets: Vec<String>,

    /// Path to a poltergeist.toml/.json config file (default: discovered
    /// by walking up from the current directory).
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

pub fn run(args: WatchArgs) -> Result<()> {
    let (config_path, mut config) = config::load(args.config.as_deref())?;
    let project_root = config::resolve_project_root(&config_path, &config);
    config.project_root = project_root.clone();

    if let Some(pid) = daemon_process::running_pid(&project_root) {
        bail!("poltergeistd is already running for {} (pid {pid})", project_root.display());
    }

    let runtime_config_path = project_root.join(".poltergeist").join("config.json");
    if let Some(parent) = runtime_config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&config)?;
    std::fs::write(&runtime_config_path, json)
        .with_context(|| format!("failed to write {}", runtime_config_path.display()))?;

    daemon_process::start_background(&runtime_config_path, &args.targets, &project_root)
        .context("failed to start poltergeistd")?;

    match daemon_process::wait_for_start(&project_root, START_TIMEOUT) {
        Some(pid) => {
            println!("poltergeistd started (pid {pid}), watching {}", project_root.display());
            Ok(())
        }
        None => bail!("poltergeistd did not start within {START_TIMEOUT:?}"),
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
