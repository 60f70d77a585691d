// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management: starting, stopping, and locating the
//! `poltergeistd` binary and its `daemon.pid` file.

use anyhow::{Context, Result};
use poltergeist_storage::pid_is_alive;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

pub fn pid_file(project_root: &Path) -> PathBuf {
    project_root.join(".poltergeist").join("daemon.pid")
}

/// Read the PID from `daemon.pid`, if present and alive. A stale file left
/// behind by a crashed daemon is removed and treated as "not running".
pub fn running_pid(project_root: &Path) -> Option<u32> {
    let path = pid_file(project_root);
    let content = std::fs::read_to_string(&path).ok()?;
    let pid: u32 = content.trim().parse().ok()?;
    if pid_is_alive(pid) {
        Some(pid)
    } else {
        let _ = std::fs::remove_file(&path);
        None
    }
}

/// Start `poltergeistd` in the background, pointed at `config_path`.
pub fn start_background(
    config_path: &Path,
    target_filter: &[String],
    project_root: &Path,
) -> Result<std::process::Child> {
    let binary = find_daemon_binary();
    let log_path = project_root.join(".poltergeist").join("daemon.log");
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let mut cmd = Command::new(&binary);
    cmd.arg(config_path)
        .arg("--log-file")
        .arg(&log_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    for target in target_filter {
        cmd.arg("--target").arg(target);
    }

    cmd.spawn()
        .with_context(|| format!("failed to start {}", binary.display()))
}

/// Poll until the daemon has written a live `daemon.pid`, or `timeout`
/// elapses.
pub fn wait_for_start(project_root: &Path, timeout: Duration) -> Option<u32> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(pid) = running_pid(project_root) {
            return Some(pid);
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Send `SIGTERM`, escalating to `SIGKILL` if the process outlives
/// `timeout`.
pub fn stop(pid: u32, timeout: Duration) {
    kill_signal("-15", pid);

    let deadline = Instant::now() + timeout;
    while pid_is_alive(pid) {
        if Instant::now() >= deadline {
            kill_signal("-9", pid);
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn find_daemon_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return PathBuf::from(path);
    }

    let current_exe = std::env::current_exe().ok();
    let is_debug_build = current_exe
        .as_ref()
        .and_then(|p| p.to_str())
        .map(|s| s.contains("target/debug"))
        .unwrap_or(false);

    if is_debug_build {
        if let Some(manifest_dir) = crate::env::cargo_manifest_dir() {
            if let Some(dev_path) = PathBuf::from(manifest_dir)
                .parent()
                .and_then(|p| p.parent())
                .map(|p| p.join("target/debug/poltergeistd"))
            {
                if dev_path.exists() {
                    return dev_path;
                }
            }
        }
    }

    if let Some(exe) = current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("poltergeistd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("poltergeistd")
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
