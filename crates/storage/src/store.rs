// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::StateError;
use crate::liveness::pid_is_alive;
use crate::patch::StatePatch;
use parking_lot::Mutex;
use poltergeist_core::{BuildStatus, Clock, TargetState};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default heartbeat refresh interval, per `SPEC_FULL.md` §4.1.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
/// `IsLocked` treats a heartbeat as stale once it is older than this many
/// multiples of the heartbeat interval.
pub const DEFAULT_STALENESS_MULTIPLIER: u32 = 5;

/// Durable per-target state store (C1). One instance is owned exclusively
/// by the Orchestrator; all writes from this process funnel through the
/// single `write_lock`, and each write is atomic on disk via
/// temp-file-then-rename.
pub struct StateStore {
    state_dir: PathBuf,
    process_id: u32,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
    /// Targets `Initialize`d by this process, tracked so `StartHeartbeat`
    /// and `Cleanup` know which files they own.
    owned: Mutex<HashSet<String>>,
    heartbeat_interval: Duration,
    staleness_multiplier: u32,
}

impl StateStore {
    /// Opens (creating if necessary) the state directory under
    /// `<project_root>/.poltergeist/state`.
    pub fn open(project_root: &Path, clock: Arc<dyn Clock>) -> Result<Self, StateError> {
        let state_dir = project_root.join(".poltergeist").join("state");
        create_dir_0755(&state_dir).map_err(|source| StateError::Io {
            target: "<state-dir>".to_string(),
            source,
        })?;
        Ok(Self {
            state_dir,
            process_id: std::process::id(),
            clock,
            write_lock: Mutex::new(()),
            owned: Mutex::new(HashSet::new()),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            staleness_multiplier: DEFAULT_STALENESS_MULTIPLIER,
        })
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_staleness_multiplier(mut self, multiplier: u32) -> Self {
        self.staleness_multiplier = multiplier;
        self
    }

    fn path_for(&self, sanitized_name: &str) -> PathBuf {
        self.state_dir.join(format!("{sanitized_name}.json"))
    }

    /// Writes a fresh record, overwriting any prior one, and marks the
    /// target as owned by this process for heartbeat/cleanup purposes.
    pub fn initialize(
        &self,
        sanitized_name: &str,
        display_name: &str,
        status: BuildStatus,
    ) -> Result<TargetState, StateError> {
        let now = self.clock.now_utc();
        let mut state = TargetState::fresh(display_name, self.process_id, now);
        state.build_status = status;
        self.write(sanitized_name, &state)?;
        self.owned.lock().insert(sanitized_name.to_string());
        Ok(state)
    }

    pub fn read(&self, sanitized_name: &str) -> Result<TargetState, StateError> {
        self.read_with_retry(sanitized_name)
    }

    fn read_with_retry(&self, sanitized_name: &str) -> Result<TargetState, StateError> {
        let path = self.path_for(sanitized_name);
        match read_state_file(&path) {
            Ok(state) => Ok(state),
            Err(ReadFailure::NotFound) => Err(StateError::NotFound(sanitized_name.to_string())),
            Err(ReadFailure::Io(source)) => Err(StateError::Io {
                target: sanitized_name.to_string(),
                source,
            }),
            Err(ReadFailure::Parse(_)) => {
                // Readers tolerate a partial write by retrying once.
                match read_state_file(&path) {
                    Ok(state) => Ok(state),
                    Err(ReadFailure::Parse(source)) => {
                        match quarantine_corrupt(&path, &source) {
                            Ok(()) => Err(StateError::NotFound(sanitized_name.to_string())),
                            Err(_) => Err(StateError::Parse {
                                target: sanitized_name.to_string(),
                                source,
                            }),
                        }
                    }
                    Err(ReadFailure::NotFound) => {
                        Err(StateError::NotFound(sanitized_name.to_string()))
                    }
                    Err(ReadFailure::Io(source)) => Err(StateError::Io {
                        target: sanitized_name.to_string(),
                        source,
                    }),
                }
            }
        }
    }

    /// Merges a field-level patch into the persisted record.
    pub fn update(&self, sanitized_name: &str, patch: StatePatch) -> Result<TargetState, StateError> {
        let _guard = self.write_lock.lock();
        let mut state = self.read_with_retry(sanitized_name)?;
        if let Some(status) = patch.build_status {
            state.build_status = status;
        }
        if let Some(t) = patch.last_build_time {
            state.last_build_time = Some(t);
        }
        if let Some(c) = patch.build_count {
            state.build_count = c;
        }
        if let Some(c) = patch.failure_count {
            state.failure_count = c;
        }
        if let Some(e) = patch.last_error {
            state.last_error = e;
        }
        for (k, v) in patch.metadata {
            state.metadata.insert(k, v);
        }
        self.write(sanitized_name, &state)?;
        Ok(state)
    }

    /// Sets `build_status`; on `succeeded`/`failed` increments
    /// `build_count` (and `failure_count` on `failed`), clears `last_error`
    /// on `succeeded`, and stamps `last_build_time`. See `SPEC_FULL.md` §9
    /// (Open Question: `succeeded` MUST clear `last_error`).
    pub fn update_build_status(
        &self,
        sanitized_name: &str,
        status: BuildStatus,
        error_message: Option<String>,
    ) -> Result<TargetState, StateError> {
        let _guard = self.write_lock.lock();
        let mut state = self.read_with_retry(sanitized_name)?;
        state.build_status = status;
        match status {
            BuildStatus::Succeeded => {
                state.build_count += 1;
                state.last_error.clear();
                state.last_build_time = Some(self.clock.now_utc());
            }
            BuildStatus::Failed => {
                state.build_count += 1;
                state.failure_count += 1;
                state.last_error = error_message.unwrap_or_default();
                state.last_build_time = Some(self.clock.now_utc());
            }
            _ => {
                if let Some(msg) = error_message {
                    state.last_error = msg;
                }
            }
        }
        self.write(sanitized_name, &state)?;
        Ok(state)
    }

    pub fn remove(&self, sanitized_name: &str) -> Result<(), StateError> {
        let _guard = self.write_lock.lock();
        let path = self.path_for(sanitized_name);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StateError::Io {
                    target: sanitized_name.to_string(),
                    source,
                })
            }
        }
        self.owned.lock().remove(sanitized_name);
        Ok(())
    }

    /// True iff the file exists, its recorded `process_id` differs from
    /// ours, that process is alive, and its heartbeat is fresher than the
    /// staleness threshold. On any error (missing file, parse failure)
    /// this returns `false` rather than propagating — a stale or unreadable
    /// record must never block startup.
    pub fn is_locked(&self, sanitized_name: &str) -> bool {
        let state = match self.read_with_retry(sanitized_name) {
            Ok(state) => state,
            Err(_) => return false,
        };
        if state.process_id == self.process_id {
            return false;
        }
        if !pid_is_alive(state.process_id) {
            return false;
        }
        let staleness = self.heartbeat_interval * self.staleness_multiplier;
        let age = self.clock.now_utc().signed_duration_since(state.heartbeat);
        match age.to_std() {
            Ok(age) => age <= staleness,
            Err(_) => {
                // Negative duration: heartbeat is in the future (clock
                // skew). Treat as fresh rather than erroring out.
                true
            }
        }
    }

    /// Enumerates and parses all state files, skipping (and logging) any
    /// that fail to parse rather than aborting the scan.
    pub fn discover_states(&self) -> Result<Vec<TargetState>, StateError> {
        let entries = fs::read_dir(&self.state_dir).map_err(|source| StateError::Io {
            target: "<state-dir>".to_string(),
            source,
        })?;
        let mut out = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_state_file(&path) {
                Ok(state) => out.push(state),
                Err(ReadFailure::Parse(source)) => {
                    let _ = quarantine_corrupt(&path, &source);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = ?e, "skipping unreadable state file");
                }
            }
        }
        Ok(out)
    }

    /// Spawns a background task that refreshes the heartbeat of every
    /// target owned by this process at a fixed interval, until `token` is
    /// cancelled.
    pub fn start_heartbeat(self: &Arc<Self>, token: CancellationToken) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        let interval = store.heartbeat_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let owned: Vec<String> = store.owned.lock().iter().cloned().collect();
                        for name in owned {
                            let patch = StatePatch::new();
                            if let Err(e) = store.touch_heartbeat(&name, patch) {
                                // Heartbeat failures are logged at debug and
                                // never propagated, per SPEC_FULL.md §7.
                                debug!(target = %name, error = %e, "heartbeat refresh failed");
                            }
                        }
                    }
                }
            }
        })
    }

    fn touch_heartbeat(&self, sanitized_name: &str, _patch: StatePatch) -> Result<(), StateError> {
        let _guard = self.write_lock.lock();
        let mut state = self.read_with_retry(sanitized_name)?;
        state.heartbeat = self.clock.now_utc();
        self.write(sanitized_name, &state)
    }

    /// For every target owned by this process, sets status to `idle` and
    /// `process_id` to 0, per `SPEC_FULL.md` §4.1/§4.6 shutdown sequence.
    pub fn cleanup(&self) {
        let owned: Vec<String> = self.owned.lock().iter().cloned().collect();
        for name in owned {
            let _guard = self.write_lock.lock();
            match self.read_with_retry(&name) {
                Ok(mut state) => {
                    state.build_status = BuildStatus::Idle;
                    state.process_id = 0;
                    if let Err(e) = self.write(&name, &state) {
                        warn!(target = %name, error = %e, "failed to clean up state on shutdown");
                    }
                }
                Err(e) => {
                    warn!(target = %name, error = %e, "failed to read state during cleanup");
                }
            }
        }
    }

    fn write(&self, sanitized_name: &str, state: &TargetState) -> Result<(), StateError> {
        let path = self.path_for(sanitized_name);
        write_atomic(&path, state).map_err(|source| StateError::Io {
            target: sanitized_name.to_string(),
            source,
        })
    }
}

enum ReadFailure {
    NotFound,
    Io(io::Error),
    Parse(serde_json::Error),
}

fn read_state_file(path: &Path) -> Result<TargetState, ReadFailure> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ReadFailure::NotFound),
        Err(e) => return Err(ReadFailure::Io(e)),
    };
    serde_json::from_slice(&bytes).map_err(ReadFailure::Parse)
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak`/`.bak.N` path for `path`, rotating older backups
/// out. Keeps up to [`MAX_BAK_FILES`] backups (`.bak`, `.bak.2`, `.bak.3`);
/// the oldest is removed when the limit is reached.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

/// Moves an unparseable state file out of the way to a rotated `.bak` path
/// so the next `Initialize` starts fresh instead of wedging on permanently
/// corrupt JSON.
fn quarantine_corrupt(path: &Path, error: &serde_json::Error) -> io::Result<()> {
    let bak_path = rotate_bak_path(path);
    warn!(
        error = %error,
        path = %path.display(),
        bak = %bak_path.display(),
        "corrupt state file, moving to .bak and starting fresh",
    );
    fs::rename(path, &bak_path)
}

/// Writes `value` to `path` atomically: serialize to a temp file in the
/// same directory, `fsync`, then `rename` over the destination. Mirrors
/// the save-to-temp-then-rename discipline used for crash-safe snapshots.
fn write_atomic<T: serde::Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("state");
    let tmp_path = dir.join(format!(".{file_name}.tmp-{}", std::process::id()));

    {
        let file = fs::File::create(&tmp_path)?;
        let mut writer = io::BufWriter::new(&file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        use io::Write;
        writer.flush()?;
        drop(writer);
        file.sync_all()?;
    }
    set_mode_0644(&tmp_path);
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(unix)]
fn create_dir_0755(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::create_dir_all(dir)?;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn create_dir_0755(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn set_mode_0644(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o644));
}

#[cfg(not(unix))]
fn set_mode_0644(_path: &Path) {}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
