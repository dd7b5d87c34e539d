// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{AgentAdapter, AgentAdapterError, AgentHandle, AgentSpawnConfig};
use crate::message::AgentMessage;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Spawns the configured agent binary as a child process and parses its
/// stdout as newline-delimited [`AgentMessage`] JSON (spec §4.1 step 1-2).
pub struct SubprocessAgentAdapter {
    binary: String,
    extra_args: Vec<String>,
}

impl SubprocessAgentAdapter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    fn build_command(&self, config: &AgentSpawnConfig) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(&config.workspace)
            .args(&self.extra_args)
            .arg("--output-format")
            .arg("stream-json")
            .arg("--print")
            .arg(&config.prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(system_prompt) = &config.system_prompt {
            cmd.arg("--append-system-prompt").arg(system_prompt);
        }
        if let Some(model) = &config.model_hint {
            cmd.arg("--model").arg(model);
        }
        if let Some(session_id) = &config.resume_session_id {
            cmd.arg("--resume").arg(session_id);
        }
        if let Some(tools) = &config.allowed_tools {
            cmd.arg("--allowed-tools").arg(tools.join(","));
        }
        if let Some(max_turns) = config.max_turns {
            cmd.arg("--max-turns").arg(max_turns.to_string());
        }
        if let Some(max_budget) = config.max_budget_usd {
            cmd.arg("--max-budget-usd").arg(max_budget.to_string());
        }
        cmd
    }
}

#[async_trait]
impl AgentAdapter for SubprocessAgentAdapter {
    async fn spawn(&self, config: AgentSpawnConfig) -> Result<AgentHandle, AgentAdapterError> {
        if !config.workspace.is_dir() {
            return Err(AgentAdapterError::WorkspaceNotFound(config.workspace));
        }

        let mut command = self.build_command(&config);
        let mut child: Child = command
            .spawn()
            .map_err(|e| AgentAdapterError::Spawn(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentAdapterError::Spawn("child had no stdout pipe".into()))?;

        let (tx, rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        let child = Arc::new(Mutex::new(child));
        let reader_child = Arc::clone(&child);

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<AgentMessage>(trimmed) {
                            Ok(message) => {
                                if tx.send(message).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                tracing::warn!(error = %err, line = %trimmed, "unparsable agent stream line");
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!(error = %err, "error reading agent stdout");
                        break;
                    }
                }
            }
            let _ = reader_child.lock().start_kill();
        });

        let killer_child = Arc::clone(&child);
        let handle = AgentHandle::new(rx, move || {
            killer_child
                .lock()
                .start_kill()
                .map_err(|e| AgentAdapterError::Kill(e.to_string()))
        });

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_command_includes_resume_flag_when_session_set() {
        let adapter = SubprocessAgentAdapter::new("true");
        let config = AgentSpawnConfig {
            prompt: "hello".into(),
            workspace: std::env::temp_dir(),
            system_prompt: None,
            model_hint: None,
            resume_session_id: Some("sess-1".into()),
            allowed_tools: None,
            max_turns: None,
            max_budget_usd: None,
        };
        let cmd = adapter.build_command(&config);
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.iter().any(|a| a == "--resume"));
        assert!(args.iter().any(|a| a == "sess-1"));
    }

    #[tokio::test]
    async fn spawn_rejects_missing_workspace() {
        let adapter = SubprocessAgentAdapter::new("true");
        let config = AgentSpawnConfig {
            prompt: "hi".into(),
            workspace: "/definitely/not/a/real/path".into(),
            system_prompt: None,
            model_hint: None,
            resume_session_id: None,
            allowed_tools: None,
            max_turns: None,
            max_budget_usd: None,
        };
        let result = adapter.spawn(config).await;
        assert!(matches!(result, Err(AgentAdapterError::WorkspaceNotFound(_))));
    }
}
