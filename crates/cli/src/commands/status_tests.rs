// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("poltergeist.toml");
    std::fs::write(
        &path,
        r#"
project_root = "."

[[targets]]
name = "app"
kind = "executable"
watch_patterns = ["**/*.rs"]
build_command = "true"
enabled = true
max_retries = 0
backoff_multiplier = 2.0
debounce_interval_ms = 10
settling_delay_ms = 10
"#,
    )
    .unwrap();
    path
}

#[test]
fn reports_no_state_for_a_project_that_has_never_built() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path());
    let args = StatusArgs {
        config: Some(config_path),
    };
    assert!(run(args).is_ok());
}

#[yare::parameterized(
    just_now       = { 0,     "0s ago" },
    seconds        = { 45,    "45s ago" },
    one_minute     = { 60,    "1m ago" },
    five_minutes   = { 300,   "5m ago" },
    one_hour       = { 3_600, "1h ago" },
    one_day        = { 86_400, "1d ago" },
)]
fn format_time_ago_buckets_by_magnitude(seconds_ago: i64, expected: &str) {
    let then = Utc::now() - chrono::Duration::seconds(seconds_ago);
    assert_eq!(format_time_ago(then), expected);
}
