//! Daemon lifecycle specs.
//!
//! Verify `collabot daemon` start/stop/status and the state files
//! `collabotd` leaves behind, without ever spawning an agent subprocess.

use crate::prelude::*;

#[test]
fn daemon_status_fails_when_not_running() {
    let temp = Project::empty();

    temp.collabot().args(&["daemon", "status"]).passes().stdout_has("not running");
}

#[test]
fn daemon_start_reports_success() {
    let temp = Project::empty();

    temp.collabot().args(&["daemon", "start"]).passes().stdout_has("started");
}

#[test]
fn daemon_start_twice_reports_already_running() {
    let temp = Project::empty();

    temp.collabot().args(&["daemon", "start"]).passes();
    temp.collabot().args(&["daemon", "start"]).passes().stdout_has("already running");
}

#[test]
fn daemon_status_shows_running_after_start() {
    let temp = Project::empty();
    temp.collabot().args(&["daemon", "start"]).passes();

    let running = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.collabot().args(&["daemon", "status"]).passes().stdout().contains("running")
    });
    assert!(running, "daemon should report running after start");
}

#[test]
fn daemon_stop_reports_success() {
    let temp = Project::empty();
    temp.collabot().args(&["daemon", "start"]).passes();

    temp.collabot().args(&["daemon", "stop"]).passes().stdout_has("stopped");
}

#[test]
fn daemon_status_fails_after_stop() {
    let temp = Project::empty();
    temp.collabot().args(&["daemon", "start"]).passes();
    temp.collabot().args(&["daemon", "stop"]).passes();

    let stopped = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.collabot().args(&["daemon", "status"]).passes().stdout().contains("not running")
    });
    assert!(stopped, "daemon should report not running after stop");
}

#[test]
fn daemon_stop_without_start_is_a_noop() {
    let temp = Project::empty();

    temp.collabot().args(&["daemon", "stop"]).passes().stdout_has("not running");
}

#[test]
fn daemon_creates_pid_file() {
    let temp = Project::empty();
    temp.collabot().args(&["daemon", "start"]).passes();

    let pid_file = temp.state_path().join("daemon.pid");
    let has_pid = wait_for(SPEC_WAIT_MAX_MS, || pid_file.exists());
    assert!(has_pid, "daemon.pid file should exist");
}

#[test]
fn daemon_creates_socket_file() {
    let temp = Project::empty();
    temp.collabot().args(&["daemon", "start"]).passes();

    let socket_file = temp.state_path().join("daemon.sock");
    let has_socket = wait_for(SPEC_WAIT_MAX_MS, || socket_file.exists());
    assert!(has_socket, "daemon socket file should exist");
}

#[test]
fn daemon_creates_version_file() {
    let temp = Project::empty();
    temp.collabot().args(&["daemon", "start"]).passes();

    let version_file = temp.state_path().join("daemon.version");
    let has_version = wait_for(SPEC_WAIT_MAX_MS, || version_file.exists());
    assert!(has_version, "daemon.version file should exist");
}

#[test]
fn daemon_stop_removes_socket_file() {
    let temp = Project::empty();
    temp.collabot().args(&["daemon", "start"]).passes();
    temp.collabot().args(&["daemon", "stop"]).passes();

    let socket_file = temp.state_path().join("daemon.sock");
    let removed = wait_for(SPEC_WAIT_MAX_MS, || !socket_file.exists());
    assert!(removed, "daemon socket file should be removed on graceful stop");
}

#[test]
fn daemon_restarts_after_previous_instance_stopped() {
    let temp = Project::empty();

    temp.collabot().args(&["daemon", "start"]).passes();
    temp.collabot().args(&["daemon", "stop"]).passes();

    temp.collabot().args(&["daemon", "start"]).passes();
    let running = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.collabot().args(&["daemon", "status"]).passes().stdout().contains("running")
    });
    assert!(running, "daemon should be able to start again after a clean stop");
}

#[test]
fn daemon_status_json_output_reports_running_flag() {
    let temp = Project::empty();
    temp.collabot().args(&["daemon", "start"]).passes();

    let ready = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.collabot().args(&["-o", "json", "daemon", "status"]).passes().stdout().contains("\"running\": true")
    });
    assert!(ready, "json status output should report running: true");
}

#[test]
fn running_collabotd_directly_while_daemon_running_does_not_disrupt_it() {
    let temp = Project::empty();
    temp.collabot().args(&["daemon", "start"]).passes();

    let running = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.collabot().args(&["daemon", "status"]).passes().stdout().contains("running")
    });
    assert!(running, "daemon should be running before the direct-invocation check");

    let output = std::process::Command::new(collabotd_binary())
        .env("COLLABOT_STATE_DIR", temp.state_path())
        .output()
        .expect("collabotd should run");
    assert!(!output.status.success(), "collabotd should refuse to start when one is already running");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already running"), "stderr should mention 'already running', got: {stderr}");

    temp.collabot().args(&["daemon", "status"]).passes().stdout_has("running");
    assert!(temp.state_path().join("daemon.sock").exists(), "socket file must survive failed collabotd");
    assert!(temp.state_path().join("daemon.pid").exists(), "pid file must survive failed collabotd");
}
