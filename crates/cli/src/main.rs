// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! poltergeist - build orchestrator CLI

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod color;
mod commands;
mod config;
mod daemon_process;
mod env;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{status, stop, watch};

#[derive(Parser)]
#[command(name = "poltergeist", version, about = "File-watching build orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the orchestrator in the background for the current project
    Watch(watch::WatchArgs),
    /// Show daemon liveness and per-target build state
    Status(status::StatusArgs),
    /// Stop the running orchestrator
    Stop(stop::StopArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Watch(args) => watch::run(args),
        Commands::Status(args) => status::run(args),
        Commands::Stop(args) => stop::run(args),
    }
}
