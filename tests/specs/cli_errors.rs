//! Config discovery and validation errors surfaced through the CLI.

use crate::prelude::*;

#[test]
fn status_without_a_config_file_fails_with_a_helpful_message() {
    let project = Project::empty();
    project
        .cli()
        .args(&["status"])
        .fails()
        .stderr_has("no poltergeist.toml or poltergeist.json found");
}

#[test]
fn watch_rejects_a_config_with_no_enabled_targets() {
    let config = r#"
project_root = "."

[[targets]]
name = "app"
kind = "executable"
watch_patterns = ["**"]
build_command = "true"
enabled = false
"#;
    let project = Project::with_config(config);
    project
        .cli()
        .args(&["watch"])
        .fails()
        .stderr_has("invalid configuration");
}

#[test]
fn stop_when_nothing_is_running_reports_so_and_exits_zero() {
    let project = Project::with_config(MINIMAL_CONFIG);
    project
        .cli()
        .args(&["stop"])
        .passes()
        .stdout_eq("poltergeistd is not running");
}
