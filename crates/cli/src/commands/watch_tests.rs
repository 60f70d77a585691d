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
fn refuses_to_start_a_second_daemon_for_the_same_project() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path());

    let pid_path = crate::daemon_process::pid_file(tmp.path());
    std::fs::create_dir_all(pid_path.parent().unwrap()).unwrap();
    std::fs::write(&pid_path, std::process::id().to_string()).unwrap();

    let args = WatchArgs {
        targets: Vec::new(),
        config: Some(config_path),
    };
    let err = run(args).unwrap_err();
    assert!(err.to_string().contains("already running"));
}
