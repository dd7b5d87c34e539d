// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate, grounded
//! on the teacher's `env.rs` (same resolution order, `OJ_*` renamed to
//! `COLLABOT_*`).

use std::path::PathBuf;

use crate::config::ConfigError;

/// Resolve the state directory: `COLLABOT_STATE_DIR` > `XDG_STATE_HOME/collabot`
/// > `~/.local/state/collabot`.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("COLLABOT_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("collabot"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/collabot"))
}

/// Agent binary override, used in place of whatever `config.toml` names.
pub fn agent_binary() -> Option<String> {
    std::env::var("COLLABOT_AGENT_BIN").ok()
}

/// Default model override.
pub fn default_model() -> Option<String> {
    std::env::var("COLLABOT_DEFAULT_MODEL").ok()
}
