// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management: start/stop `collabotd` in the background and
//! probe whether it is reachable, grounded on the teacher's
//! `cli/daemon_process.rs` (same spawn/kill/probe shape, trimmed of the
//! runbook-specific workspace plumbing that has no Collabot counterpart).

use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};

use crate::error::ClientError;

/// Start `collabotd` in the background, returning its child handle.
pub fn start_daemon_background() -> Result<std::process::Child, ClientError> {
    let daemon_path = find_daemon_binary();
    Command::new(&daemon_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Stop the daemon synchronously via SIGTERM, escalating to SIGKILL if it
/// doesn't exit within the timeout. Used by `collabot daemon stop`.
pub fn stop_daemon_sync(lock_path: &std::path::Path) {
    let Some(pid) = read_daemon_pid(lock_path) else {
        return;
    };

    kill_signal("-15", pid);
    let start = Instant::now();
    let timeout = Duration::from_secs(2);
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    if process_exists(pid) {
        kill_signal("-9", pid);
    }
}

/// Poll until `path` is accepting connections, or until `timeout` elapses.
/// Returns `true` if the daemon became reachable.
pub async fn wait_for_socket(path: &std::path::Path, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if tokio::net::UnixStream::connect(path).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Cheap liveness probe: can we connect right now?
pub fn probe_socket(path: &std::path::Path) -> bool {
    std::os::unix::net::UnixStream::connect(path).is_ok()
}

fn find_daemon_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary_override() {
        return PathBuf::from(path);
    }

    // Debug builds of the CLI look for a sibling debug build of the daemon
    // before falling back to searching $PATH.
    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(dir) = current_exe.parent() {
            let sibling = dir.join("collabotd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("collabotd")
}

fn read_daemon_pid(lock_path: &std::path::Path) -> Option<u32> {
    std::fs::read_to_string(lock_path)
        .ok()?
        .trim()
        .parse::<u32>()
        .ok()
}

fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}

/// Sends `signal` to `pid` by shelling out to `kill(1)`; returns whether the
/// process could be signaled (which also serves as a liveness check when
/// `signal == "-0"`).
fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
