// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `AgentAdapter` trait: spawn an agent subprocess, feed it a prompt,
//! and stream back its [`AgentMessage`](crate::message::AgentMessage)s.

mod subprocess;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use subprocess::SubprocessAgentAdapter;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{AgentCall, FakeAgentAdapter};

use crate::message::AgentMessage;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

/// Parameters the runtime supplies when starting a dispatch (spec §4.1
/// step 1).
#[derive(Debug, Clone)]
pub struct AgentSpawnConfig {
    pub prompt: String,
    pub workspace: PathBuf,
    pub system_prompt: Option<String>,
    pub model_hint: Option<String>,
    pub resume_session_id: Option<String>,
    pub allowed_tools: Option<Vec<String>>,
    /// Resource caps the runtime enforces by handing them to the agent
    /// itself rather than policing them locally (spec §4.1 "Budget
    /// enforcement"). Omitted for conversational/draft dispatches.
    pub max_turns: Option<u32>,
    pub max_budget_usd: Option<f64>,
}

/// A running (or exited) agent process handle returned by `spawn`.
pub struct AgentHandle {
    /// Receives one [`AgentMessage`] per stdout line, in order, until the
    /// process exits and the channel closes.
    pub messages: mpsc::Receiver<AgentMessage>,
    killer: Box<dyn Fn() -> Result<(), AgentAdapterError> + Send + Sync>,
}

impl AgentHandle {
    pub fn new(
        messages: mpsc::Receiver<AgentMessage>,
        killer: impl Fn() -> Result<(), AgentAdapterError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            messages,
            killer: Box::new(killer),
        }
    }

    /// Sends a termination signal to the underlying process. Idempotent:
    /// killing an already-exited process is not an error.
    pub fn kill(&self) -> Result<(), AgentAdapterError> {
        (self.killer)()
    }
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle").finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum AgentAdapterError {
    #[error("failed to spawn agent process: {0}")]
    Spawn(String),
    #[error("failed to kill agent process: {0}")]
    Kill(String),
    #[error("workspace path does not exist: {}", .0.display())]
    WorkspaceNotFound(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Spawns and controls agent subprocesses. `collabot-engine`'s dispatch
/// runtime is the sole caller; this trait is the entire surface the core
/// exposes to the outside language-model-harness process (spec §1).
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    async fn spawn(&self, config: AgentSpawnConfig) -> Result<AgentHandle, AgentAdapterError>;
}
