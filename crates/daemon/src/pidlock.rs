// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `daemon.pid` advisory lock: a *process*-level convenience lock that
//! guards against two Orchestrators racing on the same project root. This
//! is distinct from the per-target `IsLocked` liveness check in C1, which
//! is data-level and must keep working even when no OS lock was ever taken
//! (see `SPEC_FULL.md` §4.6). Mirrors the teacher's
//! `oj-daemon::lifecycle` lock acquisition almost verbatim: open-without-
//! truncate, `try_lock_exclusive`, then truncate and write the PID only
//! once the lock is held.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub struct PidLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

impl PidLock {
    pub fn acquire(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.try_lock_exclusive()?;

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
#[path = "pidlock_tests.rs"]
mod tests;
