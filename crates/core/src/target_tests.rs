// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample(name: &str) -> Target {
    Target {
        name: TargetName::new(name).unwrap(),
        kind: TargetKind::Executable,
        watch_patterns: vec!["src/**/*.rs".to_string()],
        build_command: "cargo build".to_string(),
        output_path: None,
        environment: HashMap::new(),
        max_retries: 0,
        backoff_multiplier: default_backoff_multiplier(),
        debounce_interval_ms: default_debounce_ms(),
        settling_delay_ms: default_settling_ms(),
        enabled: true,
        icon: None,
        label: None,
    }
}

#[test]
fn valid_target_passes() {
    assert!(sample("t").validate().is_ok());
}

#[test]
fn rejects_no_watch_patterns() {
    let mut t = sample("t");
    t.watch_patterns.clear();
    assert_eq!(t.validate(), Err(TargetValidationError::NoWatchPatterns));
}

#[test]
fn rejects_empty_build_command() {
    let mut t = sample("t");
    t.build_command = "   ".to_string();
    assert_eq!(t.validate(), Err(TargetValidationError::EmptyBuildCommand));
}
