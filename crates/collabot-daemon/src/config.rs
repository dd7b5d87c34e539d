// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon bootstrap configuration, grounded on the teacher's
//! `lifecycle::Config` (same fixed-paths-under-the-state-dir shape),
//! simplified: no WAL/snapshot/workspaces paths since Collabot's state is
//! the dispatch-scoped JSON file tree `collabot-store` already owns.

use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::env;

const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_AGENT_BINARY: &str = "claude";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// `config.toml` under the state directory. Every field is optional; an
/// absent file is equivalent to one with every field omitted.
#[derive(Debug, Clone, Default, serde::Deserialize)]
struct FileConfig {
    default_model: Option<String>,
    agent_binary: Option<String>,
    agent_args: Option<Vec<String>>,
    #[serde(default)]
    model_aliases: HashMap<String, String>,
    max_concurrent_agents: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub log_path: PathBuf,
    pub projects_dir: PathBuf,
    pub roles_dir: PathBuf,
    pub default_model: String,
    pub agent_binary: String,
    pub agent_args: Vec<String>,
    pub model_aliases: HashMap<String, String>,
    pub max_concurrent_agents: Option<usize>,
}

impl Config {
    /// Loads configuration for the user-level daemon: fixed paths under the
    /// resolved state directory, overlaid with `config.toml` if present, in
    /// turn overlaid with environment overrides (`env::agent_binary`,
    /// `env::default_model`) — same precedence order as the teacher's
    /// env-over-file-over-default convention.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = env::state_dir()?;
        let file = Self::load_file(&state_dir.join("config.toml"))?;

        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            projects_dir: state_dir.join("projects"),
            roles_dir: state_dir.join("roles"),
            default_model: env::default_model()
                .or(file.default_model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            agent_binary: env::agent_binary()
                .or(file.agent_binary)
                .unwrap_or_else(|| DEFAULT_AGENT_BINARY.to_string()),
            agent_args: file.agent_args.unwrap_or_default(),
            model_aliases: file.model_aliases,
            max_concurrent_agents: file.max_concurrent_agents,
            state_dir,
        })
    }

    fn load_file(path: &std::path::Path) -> Result<FileConfig, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn load_falls_back_to_defaults_with_no_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("COLLABOT_STATE_DIR", dir.path());
        let config = Config::load().unwrap();
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.agent_binary, DEFAULT_AGENT_BINARY);
        assert!(config.model_aliases.is_empty());
        std::env::remove_var("COLLABOT_STATE_DIR");
    }

    #[test]
    #[serial]
    fn load_reads_model_aliases_from_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("COLLABOT_STATE_DIR", dir.path());
        std::fs::write(
            dir.path().join("config.toml"),
            "default_model = \"opus\"\n[model_aliases]\nfast = \"haiku\"\n",
        )
        .unwrap();

        let config = Config::load().unwrap();
        assert_eq!(config.default_model, "opus");
        assert_eq!(config.model_aliases.get("fast"), Some(&"haiku".to_string()));
        std::env::remove_var("COLLABOT_STATE_DIR");
    }

    #[test]
    #[serial]
    fn env_override_wins_over_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("COLLABOT_STATE_DIR", dir.path());
        std::env::set_var("COLLABOT_DEFAULT_MODEL", "env-model");
        std::fs::write(dir.path().join("config.toml"), "default_model = \"file-model\"\n").unwrap();

        let config = Config::load().unwrap();
        assert_eq!(config.default_model, "env-model");

        std::env::remove_var("COLLABOT_STATE_DIR");
        std::env::remove_var("COLLABOT_DEFAULT_MODEL");
    }
}
