// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `FileWatcher` (C6 external interface): the pluggable transport that
//! feeds change batches into the Change Router. `NotifyWatcherAdapter`
//! wraps the `notify` crate's `RecommendedWatcher`, the same crate and
//! recursive-watch construction the teacher uses in
//! `oj-adapters::agent::watcher::create_file_watcher`.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: String,
        #[source]
        source: notify::Error,
    },
}

/// A batch of paths that changed together, as reported by the underlying
/// transport.
#[derive(Debug, Clone)]
pub struct ChangeBatch {
    pub paths: Vec<String>,
}

/// Watches a project root recursively and forwards change batches on an
/// unbounded channel. The returned `RecommendedWatcher` must be kept alive
/// for the duration of the watch — dropping it stops delivery.
pub fn watch_recursive(
    root: &Path,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<ChangeBatch>), WatchError> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        match res {
            Ok(event) => {
                let paths: Vec<String> = event
                    .paths
                    .iter()
                    .filter_map(|p| p.to_str().map(str::to_string))
                    .collect();
                if !paths.is_empty() {
                    let _ = tx.send(ChangeBatch { paths });
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "file watcher reported an error");
            }
        }
    })
    .map_err(|source| WatchError::Watch {
        path: root.display().to_string(),
        source,
    })?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|source| WatchError::Watch {
            path: root.display().to_string(),
            source,
        })?;

    Ok((watcher, rx))
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::ChangeBatch;
    use tokio::sync::mpsc;

    /// A manually-driven stand-in for `watch_recursive`, for router tests
    /// that need to inject change batches without touching the filesystem.
    pub struct FakeWatchSource {
        pub tx: mpsc::UnboundedSender<ChangeBatch>,
        pub rx: Option<mpsc::UnboundedReceiver<ChangeBatch>>,
    }

    impl FakeWatchSource {
        pub fn new() -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            Self { tx, rx: Some(rx) }
        }

        pub fn emit(&self, paths: Vec<String>) {
            let _ = self.tx.send(ChangeBatch { paths });
        }

        pub fn take_receiver(&mut self) -> mpsc::UnboundedReceiver<ChangeBatch> {
            self.rx.take().expect("receiver already taken")
        }
    }

    impl Default for FakeWatchSource {
        fn default() -> Self {
            Self::new()
        }
    }
}
