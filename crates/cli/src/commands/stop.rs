// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeist stop` — signal a running Orchestrator to shut down.

use crate::{config, daemon_process};
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(clap::Args)]
pub struct StopArgs {
    /// Path to a poltergeist.toml/.json config file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

pub fn run(args: StopArgs) -> Result<()> {
    let (config_path, config) = config::load(args.config.as_deref())?;
    let project_root = config::resolve_project_root(&config_path, &config);

    match daemon_process::running_pid(&project_root) {
        Some(pid) => {
            daemon_process::stop(pid, STOP_TIMEOUT);
            println!("poltergeistd (pid {pid}) stopped");
        }
        None => println!("poltergeistd is not running"),
    }
    Ok(())
}

#[cfg(test)]
#[path = "stop_tests.rs"]
mod tests;
