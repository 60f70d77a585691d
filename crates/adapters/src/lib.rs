// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! poltergeist-adapters: concrete implementations of the pluggable
//! interfaces named in `SPEC_FULL.md` §6 — the Change Router (C5), the
//! Pattern Matcher (C8), the `notify`-backed watch transport, the one
//! concrete `Builder` (C3) this repo ships, and the desktop `Notifier` (C7).

pub mod notifier;
pub mod pattern;
pub mod router;
pub mod shell_builder;
pub mod watch;

pub use notifier::DesktopNotifier;
pub use pattern::{PatternError, PatternSet};
pub use router::{Router, RouterError};
pub use shell_builder::ShellCommandBuilder;
pub use watch::{watch_recursive, ChangeBatch, WatchError};

#[cfg(any(test, feature = "test-support"))]
pub use watch::fake::FakeWatchSource;
