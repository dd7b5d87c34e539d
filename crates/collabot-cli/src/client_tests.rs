// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn connect_without_a_socket_reports_daemon_not_running() {
    std::env::set_var("COLLABOT_STATE_DIR", "/nonexistent/collabot-cli-test-state");
    let result = DaemonClient::connect();
    assert!(matches!(result, Err(ClientError::DaemonNotRunning)));
    std::env::remove_var("COLLABOT_STATE_DIR");
}

#[test]
fn next_id_is_monotonic_and_json_encodable() {
    let a = next_id();
    let b = next_id();
    assert_ne!(a, b);
    assert!(a.is_number());
}
