// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeistd`: the Orchestrator binary.
//!
//! Started by the `poltergeist` CLI with the path to a validated,
//! already-parsed `OrchestratorConfig` JSON file as its only positional
//! argument. Owns the process-wide cancellation root and runs until a
//! shutdown signal arrives.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use poltergeist_adapters::DesktopNotifier;
use poltergeist_core::{OrchestratorConfig, SystemClock};
use poltergeist_daemon::{Orchestrator, OrchestratorError, DEFAULT_DRAIN_TIMEOUT};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1))?;
    if args.print_and_exit {
        return Ok(());
    }

    let _log_guard = setup_logging(args.log_file.as_deref());

    let config_text = std::fs::read_to_string(&args.config_path)
        .map_err(|e| format!("failed to read config at {}: {e}", args.config_path.display()))?;
    let config = OrchestratorConfig::from_json(&config_text)
        .map_err(|e| format!("failed to parse config at {}: {e}", args.config_path.display()))?;

    info!(project_root = %config.project_root.display(), "starting poltergeistd");

    let orchestrator = match Orchestrator::start(
        config,
        args.target_filter.as_deref(),
        Arc::new(DesktopNotifier::new()),
        Arc::new(SystemClock),
    )
    .await
    {
        Ok(orchestrator) => orchestrator,
        Err(OrchestratorError::LockFailed { path, .. }) => {
            eprintln!("poltergeistd is already running (lock held at {})", path.display());
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to start orchestrator: {e}");
            return Err(e.into());
        }
    };

    println!("READY");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    orchestrator.shutdown(DEFAULT_DRAIN_TIMEOUT).await;
    info!("poltergeistd stopped");
    Ok(())
}

struct Args {
    config_path: PathBuf,
    target_filter: Option<Vec<String>>,
    log_file: Option<PathBuf>,
    print_and_exit: bool,
}

impl Args {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self, String> {
        let args: Vec<String> = args.collect();
        if let Some(first) = args.first() {
            match first.as_str() {
                "--version" | "-V" => {
                    println!("poltergeistd {}", env!("CARGO_PKG_VERSION"));
                    return Ok(Self::noop());
                }
                "--help" | "-h" => {
                    println!("poltergeistd <config.json> [--target NAME]... [--log-file PATH]");
                    return Ok(Self::noop());
                }
                _ => {}
            }
        }

        let mut config_path = None;
        let mut target_filter: Vec<String> = Vec::new();
        let mut log_file = None;
        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--target" => {
                    let value = iter.next().ok_or("--target requires a value")?;
                    target_filter.push(value);
                }
                "--log-file" => {
                    let value = iter.next().ok_or("--log-file requires a value")?;
                    log_file = Some(PathBuf::from(value));
                }
                other if config_path.is_none() => config_path = Some(PathBuf::from(other)),
                other => return Err(format!("unexpected argument: {other}")),
            }
        }

        Ok(Self {
            config_path: config_path.ok_or("usage: poltergeistd <config.json>")?,
            target_filter: if target_filter.is_empty() { None } else { Some(target_filter) },
            log_file,
            print_and_exit: false,
        })
    }

    fn noop() -> Self {
        Self {
            config_path: PathBuf::new(),
            target_filter: None,
            log_file: None,
            print_and_exit: true,
        }
    }
}

fn setup_logging(log_path: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("daemon.log"));
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(non_blocking))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            None
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
