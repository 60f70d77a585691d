// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn acquire_writes_current_pid() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("daemon.pid");
    let lock = PidLock::acquire(&path).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim(), std::process::id().to_string());
    drop(lock);
}

#[test]
fn second_acquire_on_same_path_fails_while_first_is_held() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("daemon.pid");
    let _first = PidLock::acquire(&path).unwrap();
    assert!(PidLock::acquire(&path).is_err());
}

#[test]
fn dropping_the_lock_removes_the_pid_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("daemon.pid");
    let lock = PidLock::acquire(&path).unwrap();
    drop(lock);
    assert!(!path.exists());
}

#[test]
fn releasing_allows_a_fresh_lock_to_be_acquired() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("daemon.pid");
    let first = PidLock::acquire(&path).unwrap();
    drop(first);
    assert!(PidLock::acquire(&path).is_ok());
}
