// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn running_pid_is_none_without_a_pid_file() {
    let tmp = TempDir::new().unwrap();
    assert!(running_pid(tmp.path()).is_none());
}

#[test]
fn running_pid_reports_the_current_process_and_stale_pids_are_cleared() {
    let tmp = TempDir::new().unwrap();
    let path = pid_file(tmp.path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, std::process::id().to_string()).unwrap();
    assert_eq!(running_pid(tmp.path()), Some(std::process::id()));
}

#[test]
fn running_pid_clears_a_stale_pid_file() {
    let tmp = TempDir::new().unwrap();
    let path = pid_file(tmp.path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    // PID 0 is never a live process.
    std::fs::write(&path, "0").unwrap();
    assert!(running_pid(tmp.path()).is_none());
    assert!(!path.exists());
}
