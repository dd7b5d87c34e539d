// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot JSON-RPC client for talking to `collabotd` over its Unix
//! socket, grounded on the teacher's `cli/client.rs` (same
//! connect-or-start/connect-only split, same request/response plumbing),
//! narrowed to the method table spec §6 defines.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use collabot_daemon::protocol::{self, error_code, method, RpcError, RpcRequest, RpcResponse};
use collabot_daemon::protocol_wire;
use serde_json::{json, Value};
use tokio::net::UnixStream;

use crate::daemon_process::{self, start_daemon_background};
use crate::error::ClientError;

static NEXT_ID: AtomicI64 = AtomicI64::new(1);

fn next_id() -> Value {
    json!(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

fn timeout_ipc() -> Duration {
    parse_duration_ms("COLLABOT_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

fn timeout_connect() -> Duration {
    parse_duration_ms("COLLABOT_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

/// A one-shot client: every call opens a fresh connection, sends one
/// request, reads one response, and closes. Sufficient for the CLI, which
/// never needs the server-push notifications the persistent socket
/// connection in `collabot-daemon::listener` exists to support.
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Connect to an already-running daemon; fails with
    /// [`ClientError::DaemonNotRunning`] if the socket doesn't exist.
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = Self::socket_path()?;
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }
        Ok(Self { socket_path })
    }

    /// Connect to the daemon, starting it in the background first if it
    /// isn't already running. Used by action commands (`submit`, `draft`,
    /// `kill`, `create-project`) which should work on a cold machine.
    pub async fn connect_or_start() -> Result<Self, ClientError> {
        match Self::connect() {
            Ok(client) => {
                if daemon_process::probe_socket(&client.socket_path) {
                    return Ok(client);
                }
                // Stale socket left behind by an unclean shutdown.
                let _ = std::fs::remove_file(&client.socket_path);
                Self::start_and_connect().await
            }
            Err(ClientError::DaemonNotRunning) => Self::start_and_connect().await,
            Err(e) => Err(e),
        }
    }

    async fn start_and_connect() -> Result<Self, ClientError> {
        let mut child = start_daemon_background()?;
        let socket_path = Self::socket_path()?;

        if !daemon_process::wait_for_socket(&socket_path, timeout_connect()).await {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(ClientError::DaemonStartFailed(format!("exited with {status}")));
            }
            return Err(ClientError::DaemonStartTimeout);
        }
        Ok(Self { socket_path })
    }

    fn socket_path() -> Result<PathBuf, ClientError> {
        let dir = collabot_daemon::env::state_dir().map_err(|_| ClientError::NoStateDir)?;
        Ok(dir.join("daemon.sock"))
    }

    pub fn lock_path() -> Result<PathBuf, ClientError> {
        Ok(collabot_daemon::env::state_dir().map_err(|_| ClientError::NoStateDir)?.join("daemon.pid"))
    }

    /// Send one request and return its decoded result, or the daemon's
    /// rejection translated into [`ClientError::Rejected`].
    async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let request = RpcRequest::new(next_id(), method, params);
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        let data = protocol_wire::encode(&request)?;
        tokio::time::timeout(timeout_ipc(), protocol_wire::write_message(&mut writer, &data))
            .await
            .map_err(|_| protocol_wire::ProtocolError::Timeout)??;

        let bytes = tokio::time::timeout(timeout_ipc(), protocol_wire::read_message(&mut reader))
            .await
            .map_err(|_| protocol_wire::ProtocolError::Timeout)??;
        let response: RpcResponse = protocol_wire::decode(&bytes)?;

        match (response.result, response.error) {
            (Some(result), None) => Ok(result),
            (None, Some(err)) => Err(ClientError::from_rpc(err)),
            _ => Err(ClientError::from_rpc(RpcError::new(
                error_code::INTERNAL_ERROR,
                "malformed response: neither result nor error present",
            ))),
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ClientError> {
        serde_json::from_value(value)
            .map_err(|e| ClientError::from_rpc(RpcError::new(error_code::INTERNAL_ERROR, e.to_string())))
    }

    pub async fn submit_prompt(
        &self,
        content: &str,
        role: Option<&str>,
        task_slug: Option<&str>,
        project: Option<&str>,
    ) -> Result<protocol::SubmitPromptResult, ClientError> {
        let params = json!({
            "content": content,
            "role": role,
            "taskSlug": task_slug,
            "project": project,
        });
        Self::decode(self.call(method::SUBMIT_PROMPT, params).await?)
    }

    pub async fn draft(
        &self,
        role: &str,
        project: &str,
        task: &str,
    ) -> Result<protocol::DraftResult, ClientError> {
        let params = json!({ "role": role, "project": project, "task": task });
        Self::decode(self.call(method::DRAFT, params).await?)
    }

    pub async fn undraft(&self) -> Result<protocol::UndraftResult, ClientError> {
        Self::decode(self.call(method::UNDRAFT, json!({})).await?)
    }

    pub async fn draft_status(&self) -> Result<protocol::DraftStatusResult, ClientError> {
        Self::decode(self.call(method::GET_DRAFT_STATUS, json!({})).await?)
    }

    pub async fn kill_agent(&self, agent_id: &str) -> Result<protocol::KillAgentResult, ClientError> {
        let params = json!({ "agentId": agent_id });
        Self::decode(self.call(method::KILL_AGENT, params).await?)
    }

    pub async fn list_agents(&self) -> Result<protocol::ListAgentsResult, ClientError> {
        Self::decode(self.call(method::LIST_AGENTS, json!({})).await?)
    }

    pub async fn list_tasks(&self, project: &str) -> Result<protocol::ListTasksResult, ClientError> {
        let params = json!({ "project": project });
        Self::decode(self.call(method::LIST_TASKS, params).await?)
    }

    pub async fn get_task_context(
        &self,
        slug: &str,
        project: &str,
    ) -> Result<protocol::GetTaskContextResult, ClientError> {
        let params = json!({ "slug": slug, "project": project });
        Self::decode(self.call(method::GET_TASK_CONTEXT, params).await?)
    }

    pub async fn list_projects(&self) -> Result<protocol::ListProjectsResult, ClientError> {
        Self::decode(self.call(method::LIST_PROJECTS, json!({})).await?)
    }

    pub async fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
        roles: &[String],
    ) -> Result<protocol::CreateProjectResult, ClientError> {
        let params = json!({
            "name": name,
            "description": description,
            "roles": roles,
        });
        Self::decode(self.call(method::CREATE_PROJECT, params).await?)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
