// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop notification sink for the Notifier hook (C7), wrapping
//! `notify-rust` the same way the teacher's
//! `oj-adapters::notify::desktop::DesktopNotifyAdapter` does. `NoOpNotifier`
//! and `FakeNotifier` (under `test-support`) live in
//! `poltergeist_engine::queue` since the `Notifier` trait itself is defined
//! there — this module only adds the one real-world transport the teacher
//! doesn't already provide for free.

use async_trait::async_trait;
use poltergeist_engine::Notifier;
use std::time::Duration;

/// Sends a desktop toast on build start/success/failure via `notify-rust`.
/// Queue-status changes are too frequent to surface as toasts and are
/// logged instead.
///
/// On macOS, `notify-rust` uses `mac-notification-sys` (Cocoa bindings) to
/// send notifications via the Notification Center. The first notification
/// triggers an AppleScript bundle-identifier lookup that blocks forever in a
/// daemon process without Automation permissions, so the identifier is
/// pre-set at construction time to bypass that lookup.
#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        #[cfg(target_os = "macos")]
        {
            let _ = mac_notification_sys::set_application("com.apple.Terminal");
        }
        Self
    }

    fn show(summary: String, body: String) {
        tokio::task::spawn_blocking(move || match notify_rust::Notification::new()
            .summary(&summary)
            .body(&body)
            .show()
        {
            Ok(_) => tracing::debug!(%summary, "desktop notification sent"),
            Err(e) => tracing::warn!(%summary, error = %e, "desktop notification failed"),
        });
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn build_start(&self, target: &str) {
        tracing::info!(target, "build start");
    }

    async fn build_success(&self, target: &str, duration: Duration) {
        tracing::info!(target, outcome = "success", duration_ms = duration.as_millis() as u64, "build finished");
        Self::show(format!("{target} built"), format!("succeeded in {:.1}s", duration.as_secs_f64()));
    }

    async fn build_failure(&self, target: &str, error: &str) {
        tracing::warn!(target, outcome = "failure", %error, "build finished");
        Self::show(format!("{target} failed"), error.to_string());
    }

    async fn queue_status(&self, active: usize, queued: usize) {
        tracing::debug!(active, queued, "queue status");
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
