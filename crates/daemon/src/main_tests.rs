// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn args(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[test]
fn parses_a_minimal_config_path() {
    let parsed = Args::parse(args(&["config.json"]).into_iter()).unwrap();
    assert_eq!(parsed.config_path, PathBuf::from("config.json"));
    assert!(parsed.target_filter.is_none());
    assert!(parsed.log_file.is_none());
    assert!(!parsed.print_and_exit);
}

#[test]
fn parses_repeated_target_flags_and_a_log_file() {
    let parsed = Args::parse(
        args(&[
            "config.json",
            "--target",
            "app",
            "--target",
            "web",
            "--log-file",
            "daemon.log",
        ])
        .into_iter(),
    )
    .unwrap();
    assert_eq!(
        parsed.target_filter,
        Some(vec!["app".to_string(), "web".to_string()])
    );
    assert_eq!(parsed.log_file, Some(PathBuf::from("daemon.log")));
}

#[test]
fn version_flag_short_circuits_without_a_config_path() {
    let parsed = Args::parse(args(&["--version"]).into_iter()).unwrap();
    assert!(parsed.print_and_exit);
}

#[test]
fn help_flag_short_circuits_without_a_config_path() {
    let parsed = Args::parse(args(&["--help"]).into_iter()).unwrap();
    assert!(parsed.print_and_exit);
}

#[test]
fn missing_config_path_is_an_error() {
    assert!(Args::parse(std::iter::empty()).is_err());
}

#[test]
fn target_flag_without_a_value_is_an_error() {
    assert!(Args::parse(args(&["config.json", "--target"]).into_iter()).is_err());
}

#[test]
fn unexpected_trailing_argument_is_an_error() {
    assert!(Args::parse(args(&["config.json", "extra"]).into_iter()).is_err());
}
