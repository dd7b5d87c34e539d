// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 envelope types, the client→server method table, and the
//! server→client notification set (spec §6), plus the app-specific error
//! codes (spec §7). Replaces the teacher's ad hoc `Request`/`Response` enum
//! (`oj-daemon/src/protocol.rs`) with the JSON-RPC 2.0 shape the spec
//! requires; the length-prefixed wire framing in `protocol_wire.rs` is
//! reused near-verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `protocol_wire::PROTOCOL_VERSION` in the teacher concatenates a build git
/// hash onto the crate version (`concat!(CARGO_PKG_VERSION, "+", BUILD_GIT_HASH)`).
/// Collabot has no `build.rs` producing that hash, so the handshake version is
/// the crate version alone.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const JSONRPC_VERSION: &str = "2.0";

/// A client→server call (spec §6's method table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// A server→client reply to one [`RpcRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// App-specific error codes (spec §6 "App-specific error codes"), on top of
/// the standard JSON-RPC 2.0 reserved range.
pub mod error_code {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub const TASK_NOT_FOUND: i64 = -32000;
    pub const AGENT_NOT_FOUND: i64 = -32001;
    pub const ROLE_NOT_FOUND: i64 = -32002;
    pub const POOL_AT_CAPACITY: i64 = -32003;
    pub const DRAFT_ALREADY_ACTIVE: i64 = -32004;
    pub const NO_ACTIVE_DRAFT: i64 = -32005;
}

/// An unsolicited server→client frame (spec §6 "Server→client
/// notifications"). The teacher's protocol is purely request/response; this
/// variant is new.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
}

impl RpcNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
        }
    }
}

/// Any frame the daemon may write to a client connection: exactly one
/// [`RpcResponse`] per request, interleaved with zero or more
/// [`RpcNotification`]s pushed from lifecycle broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    Response(RpcResponse),
    Notification(RpcNotification),
}

pub mod method {
    pub const SUBMIT_PROMPT: &str = "submit_prompt";
    pub const DRAFT: &str = "draft";
    pub const UNDRAFT: &str = "undraft";
    pub const GET_DRAFT_STATUS: &str = "get_draft_status";
    pub const KILL_AGENT: &str = "kill_agent";
    pub const LIST_AGENTS: &str = "list_agents";
    pub const LIST_TASKS: &str = "list_tasks";
    pub const GET_TASK_CONTEXT: &str = "get_task_context";
    pub const LIST_PROJECTS: &str = "list_projects";
    pub const CREATE_PROJECT: &str = "create_project";
}

pub mod notification {
    pub const CHANNEL_MESSAGE: &str = "channel_message";
    pub const STATUS_UPDATE: &str = "status_update";
    pub const POOL_STATUS: &str = "pool_status";
    pub const DRAFT_STATUS: &str = "draft_status";
    pub const CONTEXT_COMPACTED: &str = "context_compacted";
}

// --- Method params/results (spec §6's table, field names verbatim) ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPromptParams {
    pub content: String,
    pub role: Option<String>,
    pub task_slug: Option<String>,
    pub project: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPromptResult {
    pub thread_id: String,
    pub task_slug: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftParams {
    pub role: String,
    pub project: String,
    pub task: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResult {
    pub session_id: String,
    pub task_slug: String,
    pub project: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndraftResult {
    pub session_id: String,
    pub task_slug: String,
    pub turns: u32,
    pub cost: f64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftStatusResult {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillAgentParams {
    pub agent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillAgentResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAgentsResult {
    pub agents: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListTasksParams {
    pub project: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTasksResult {
    pub tasks: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetTaskContextParams {
    pub slug: String,
    pub project: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTaskContextResult {
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListProjectsResult {
    pub projects: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectParams {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectResult {
    pub name: String,
    pub roles: Vec<String>,
}
