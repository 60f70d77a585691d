// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by the State Store. Disk errors are always returned to
//! the caller and logged; per `SPEC_FULL.md` §4.1 they never abort a build
//! in progress — callers decide whether to retry.

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("IO error for target {target}: {source}")]
    Io {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse state for target {target}: {source}")]
    Parse {
        target: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no state recorded for target {0}")]
    NotFound(String),
}
