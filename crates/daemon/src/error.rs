// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `OrchestratorError`: the `daemon` crate's own `thiserror` boundary enum,
//! matching the one-enum-per-crate-boundary convention used throughout
//! this workspace (`StateError`, `EngineError`, `RouterError`, ...).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] poltergeist_core::ConfigError),

    #[error(transparent)]
    State(#[from] poltergeist_storage::StateError),

    #[error(transparent)]
    Router(#[from] poltergeist_adapters::RouterError),

    #[error("failed to acquire daemon lock at {path}: {source}")]
    LockFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: poltergeist_adapters::WatchError,
    },

    /// A single target failed `Builder::validate`. Per `SPEC_FULL.md` §4.6
    /// this target is disabled for the run; it never aborts `start` for the
    /// others — see the `TargetValidation` match arm in `register_target`'s
    /// caller.
    #[error("target {target} failed validation: {source}")]
    TargetValidation {
        target: String,
        #[source]
        source: poltergeist_engine::BuilderError,
    },
}
