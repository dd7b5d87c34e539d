// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI-local environment overrides, grounded on the teacher's
//! `cli/env.rs`. State directory resolution is shared with the daemon
//! (`collabot_daemon::env::state_dir`) so the CLI and `collabotd` always
//! agree on where the socket and pid file live.

/// Override for the `collabotd` binary path, otherwise resolved by
/// [`crate::daemon_process::start_daemon_background`] from the CLI's own
/// location or `$PATH`.
pub fn daemon_binary_override() -> Option<String> {
    std::env::var("COLLABOT_DAEMON_BIN").ok()
}
