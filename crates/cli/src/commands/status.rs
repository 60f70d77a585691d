// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeist status` — summarize daemon liveness and per-target state.

use crate::{color, config, daemon_process};
use anyhow::{Context, Result};
use chrono::Utc;
use poltergeist_core::SystemClock;
use poltergeist_storage::StateStore;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(clap::Args)]
pub struct StatusArgs {
    /// Path to a poltergeist.toml/.json config file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let (config_path, config) = config::load(args.config.as_deref())?;
    let project_root = config::resolve_project_root(&config_path, &config);

    match daemon_process::running_pid(&project_root) {
        Some(pid) => println!("poltergeistd: running (pid {pid})"),
        None => println!("poltergeistd: not running"),
    }

    let store = StateStore::open(&project_root, Arc::new(SystemClock))
        .context("failed to open state store")?;
    let mut states = store.discover_states().context("failed to read target states")?;
    states.sort_by(|a, b| a.target_name.cmp(&b.target_name));

    if states.is_empty() {
        println!("no target state recorded yet");
        return Ok(());
    }

    println!(
        "{:<20} {:<10} {:>7} {:>7}  last build",
        "TARGET", "STATUS", "BUILDS", "FAILS"
    );
    for state in &states {
        let status_text = state.build_status.to_string();
        let last_build = state
            .last_build_time
            .map(|t| format_time_ago(t))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:<10} {:>7} {:>7}  {}",
            state.target_name,
            color::status(&status_text),
            state.build_count,
            state.failure_count,
            last_build,
        );
        if !state.last_error.is_empty() {
            println!("    last error: {}", state.last_error);
        }
    }

    Ok(())
}

fn format_time_ago(t: chrono::DateTime<Utc>) -> String {
    let elapsed = (Utc::now() - t).num_seconds().max(0);
    if elapsed < 60 {
        format!("{elapsed}s ago")
    } else if elapsed < 3_600 {
        format!("{}m ago", elapsed / 60)
    } else if elapsed < 86_400 {
        format!("{}h ago", elapsed / 3_600)
    } else {
        format!("{}d ago", elapsed / 86_400)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
