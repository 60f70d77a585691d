// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! poltergeist-engine: the Priority Engine (C2), Builder trait (C3), and
//! Build Queue (C4).

pub mod builder;
pub mod error;
pub mod priority;
pub mod queue;

pub use builder::{BuildOutcome, Builder, BuilderError};
pub use error::EngineError;
pub use priority::PriorityEngine;
pub use queue::{BuildQueue, NoOpNotifier, Notifier};

#[cfg(any(test, feature = "test-support"))]
pub use queue::{FakeNotifier, NotifyEvent};
