//! End-to-end `watch` → `status` → `stop` lifecycle against a real
//! `poltergeistd` process.

use crate::prelude::*;
use serial_test::serial;

#[test]
#[serial]
fn watch_then_status_then_stop_round_trips_cleanly() {
    let project = Project::with_config(MINIMAL_CONFIG);

    project.cli().args(&["watch"]).passes();
    assert!(
        wait_for(3_000, || project.is_running()),
        "expected daemon.pid to appear after `watch`"
    );

    let status = project.cli().args(&["status"]).passes();
    let stdout = status.stdout();
    assert!(stdout.contains("poltergeistd: running"));
    assert!(stdout.contains("app"));
    assert!(stdout.contains("idle"));

    project
        .cli()
        .args(&["watch"])
        .fails()
        .stderr_has("already running");

    project
        .cli()
        .args(&["stop"])
        .passes()
        .stdout_has("stopped");
    assert!(
        wait_for(3_000, || !project.is_running()),
        "expected daemon.pid to be removed after `stop`"
    );
}
