// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The socket listener: accepts one connection per client and dispatches
//! every request on it against the engine (spec §6), grounded on the
//! teacher's accept-loop-plus-dispatch-table structure
//! (`oj-daemon/src/listener/mod.rs`).
//!
//! Deviation from the teacher: the teacher's listener reads exactly one
//! request per connection, replies, and lets the connection close (a
//! request/response transport with no server push). Spec §6 requires five
//! server-initiated notification kinds (`channel_message`, `status_update`,
//! `pool_status`, `draft_status`, `context_compacted`) with no delivery path
//! in a one-shot model, so each connection here stays open for its
//! lifetime: a read loop decodes and dispatches requests, a writer task
//! drains both a per-connection response channel and a broadcast
//! subscription carrying every notification the daemon emits, so a
//! connection can receive pushes between, or instead of, replies.

use crate::protocol::{self, error_code, method, OutboundFrame, RpcError, RpcRequest, RpcResponse};
use crate::protocol_wire::{self, ProtocolError};
use async_trait::async_trait;
use collabot_adapters::AgentAdapter;
use collabot_core::{Clock, DispatchId, ProjectName, Role, RoleName, Task, TaskSlug};
use collabot_engine::{DispatchInput, DraftManager, FullTools, RuntimeError, ToolSurfaceError};
use collabot_providers::{InboundMessage, InboundResult, ProviderRegistry};
use collabot_store::StoreError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

/// Everything one connection's request dispatch needs. Cheap to share via
/// `Arc`: every field is itself an `Arc`, a `Clone` clock, or plain data
/// loaded once at startup.
pub struct DaemonCtx<A, C>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    pub tools: FullTools<A, C>,
    pub draft_manager: Arc<DraftManager<A, C>>,
    pub providers: Arc<ProviderRegistry>,
    pub roles: Arc<HashMap<RoleName, Role>>,
    pub projects_dir: PathBuf,
    pub clock: C,
    pub notifications: broadcast::Sender<protocol::RpcNotification>,
}

impl<A, C> DaemonCtx<A, C>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    fn role(&self, name: &str) -> Result<Role, RuntimeError> {
        self.roles
            .get(&RoleName::new(name))
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownRole(name.to_string()))
    }

    fn project(&self, name: &str) -> Result<collabot_core::Project, RuntimeError> {
        let project_name = ProjectName::new(name);
        collabot_store::project_manifest::read_project(&self.projects_dir, &project_name)
            .map_err(RuntimeError::Store)?
            .ok_or_else(|| RuntimeError::UnknownProject(name.to_string()))
    }

    /// Loads the task manifest for `(project, slug)`, creating and
    /// persisting a fresh one if this is the task's first dispatch.
    fn task_or_create(
        &self,
        project: &collabot_core::Project,
        slug: &TaskSlug,
    ) -> Result<(Task, PathBuf), RuntimeError> {
        let task_dir = collabot_store::dispatch_store::task_dir(&self.projects_dir, &project.name, slug);
        match collabot_store::task_manifest::read_task(&task_dir).map_err(RuntimeError::Store)? {
            Some(task) => Ok((task, task_dir)),
            None => {
                let task = Task::new(slug.clone(), project.name.clone(), slug.to_string(), self.clock.now());
                collabot_store::task_manifest::write_task(&task_dir, &task).map_err(RuntimeError::Store)?;
                Ok((task, task_dir))
            }
        }
    }

    fn working_dir(project: &collabot_core::Project, task_dir: &std::path::Path) -> PathBuf {
        project.paths.first().cloned().unwrap_or_else(|| task_dir.to_path_buf())
    }
}

/// Maps every engine-level error variant onto the app-specific JSON-RPC
/// error codes spec §7 assigns (the ones with no dedicated code fall back to
/// the nearest standard JSON-RPC range).
fn store_rpc_error(err: StoreError) -> RpcError {
    match err {
        StoreError::TaskNotFound(id) => RpcError::new(error_code::TASK_NOT_FOUND, format!("task not found: {id}")),
        StoreError::RoleNotFound(id) => RpcError::new(error_code::ROLE_NOT_FOUND, format!("role not found: {id}")),
        StoreError::DispatchNotFound(id) => {
            RpcError::new(error_code::AGENT_NOT_FOUND, format!("agent not found: {id}"))
        }
        StoreError::NoActiveDraft => RpcError::new(error_code::NO_ACTIVE_DRAFT, err.to_string()),
        StoreError::DraftAlreadyActive(_) => RpcError::new(error_code::DRAFT_ALREADY_ACTIVE, err.to_string()),
        StoreError::ProjectNotFound(_)
        | StoreError::MultipleActiveDrafts
        | StoreError::Io { .. }
        | StoreError::Corrupt { .. }
        | StoreError::CorruptRole { .. } => RpcError::new(error_code::INTERNAL_ERROR, err.to_string()),
    }
}

fn runtime_rpc_error(err: RuntimeError) -> RpcError {
    match err {
        RuntimeError::TaskNotFound(id) => RpcError::new(error_code::TASK_NOT_FOUND, format!("task not found: {id}")),
        RuntimeError::DispatchNotFound(id) => {
            RpcError::new(error_code::AGENT_NOT_FOUND, format!("agent not found: {id}"))
        }
        RuntimeError::UnknownRole(id) => RpcError::new(error_code::ROLE_NOT_FOUND, format!("unknown role: {id}")),
        RuntimeError::PoolAtCapacity => RpcError::new(error_code::POOL_AT_CAPACITY, err.to_string()),
        RuntimeError::DraftAlreadyActive => RpcError::new(error_code::DRAFT_ALREADY_ACTIVE, err.to_string()),
        RuntimeError::NoActiveDraft => RpcError::new(error_code::NO_ACTIVE_DRAFT, err.to_string()),
        RuntimeError::Store(inner) => store_rpc_error(inner),
        RuntimeError::UnknownProject(_)
        | RuntimeError::RoleNotPermitted { .. } => RpcError::new(error_code::INVALID_PARAMS, err.to_string()),
        RuntimeError::DuplicateProviderName(_) | RuntimeError::Adapter(_) => {
            RpcError::new(error_code::INTERNAL_ERROR, err.to_string())
        }
    }
}

fn tool_surface_rpc_error(err: ToolSurfaceError) -> RpcError {
    match err {
        ToolSurfaceError::Runtime(inner) => runtime_rpc_error(inner),
        ToolSurfaceError::Store(inner) => store_rpc_error(inner),
    }
}

/// Dispatches one decoded request to its handler and renders either a
/// result or an error into an [`RpcResponse`] (spec §6's method table, §7's
/// error shape).
async fn handle_request<A, C>(ctx: &DaemonCtx<A, C>, request: RpcRequest) -> RpcResponse
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    let id = request.id.clone();
    let outcome = dispatch(ctx, &request.method, request.params).await;
    match outcome {
        Ok(result) => RpcResponse::ok(id, result),
        Err(error) => RpcResponse::err(id, error),
    }
}

async fn dispatch<A, C>(ctx: &DaemonCtx<A, C>, method: &str, params: Value) -> Result<Value, RpcError>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    match method {
        method::SUBMIT_PROMPT => submit_prompt(ctx, params).await,
        method::DRAFT => draft(ctx, params).await,
        method::UNDRAFT => undraft(ctx).await,
        method::GET_DRAFT_STATUS => get_draft_status(ctx).await,
        method::KILL_AGENT => kill_agent(ctx, params).await,
        method::LIST_AGENTS => list_agents(ctx).await,
        method::LIST_TASKS => list_tasks(ctx, params).await,
        method::GET_TASK_CONTEXT => get_task_context(ctx, params).await,
        method::LIST_PROJECTS => list_projects(ctx).await,
        method::CREATE_PROJECT => create_project(ctx, params).await,
        other => Err(RpcError::new(
            error_code::METHOD_NOT_FOUND,
            format!("unknown method: {other}"),
        )),
    }
}

fn invalid_params(err: impl std::fmt::Display) -> RpcError {
    RpcError::new(error_code::INVALID_PARAMS, format!("invalid params: {err}"))
}

/// Encodes a result struct as JSON, mapping the (unreachable in practice,
/// since every result here is built from plain owned data) serialization
/// failure onto an internal-error response instead of panicking.
fn to_json(value: impl serde::Serialize) -> Result<Value, RpcError> {
    serde_json::to_value(value)
        .map_err(|e| RpcError::new(error_code::INTERNAL_ERROR, format!("failed to encode response: {e}")))
}

async fn submit_prompt<A, C>(ctx: &DaemonCtx<A, C>, params: Value) -> Result<Value, RpcError>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    let params: protocol::SubmitPromptParams = serde_json::from_value(params).map_err(invalid_params)?;

    let inbound = InboundMessage {
        provider_id: "rpc".into(),
        channel: params.task_slug.clone().unwrap_or_default(),
        text: params.content.clone(),
    };
    match ctx.providers.route_inbound(inbound).await {
        Ok(InboundResult::RoutedToDraft { draft_session_id }) => {
            // The active draft's task slug, not the caller's params, is
            // authoritative once a turn has actually been routed to it.
            let task_slug = ctx
                .draft_manager
                .active_session()
                .map(|s| s.task_slug.to_string())
                .unwrap_or_default();
            return to_json(protocol::SubmitPromptResult { thread_id: draft_session_id, task_slug });
        }
        Ok(InboundResult::NoActiveDraft) => {}
        Err(err) => return Err(RpcError::new(error_code::INTERNAL_ERROR, err.to_string())),
    }

    let role_name = params.role.unwrap_or_else(|| "assistant".into());
    let role = ctx.role(&role_name).map_err(runtime_rpc_error)?;

    let project_name = params.project.unwrap_or_else(|| "default".into());
    let project = ctx.project(&project_name).map_err(runtime_rpc_error)?;

    let slug = TaskSlug::new(
        params
            .task_slug
            .unwrap_or_else(|| collabot_core::UuidIdGen.next()),
    );
    let (task, task_dir) = ctx.task_or_create(&project, &slug).map_err(runtime_rpc_error)?;
    let working_dir = DaemonCtx::<A, C>::working_dir(&project, &task_dir);
    let include_history = !task.dispatches.is_empty();

    let input = DispatchInput {
        prompt: params.content,
        role,
        task: task.clone(),
        project: project.name.clone(),
        task_dir,
        working_dir,
        channel: slug.to_string(),
        parent_dispatch_id: None,
        model_override: None,
        max_turns: None,
        max_budget_usd: None,
        project_context: project.description.clone(),
        include_task_history: include_history,
    };

    let dispatch_id = ctx.tools.draft_agent(input).map_err(tool_surface_rpc_error)?;
    to_json(protocol::SubmitPromptResult { thread_id: dispatch_id.to_string(), task_slug: slug.to_string() })
}

async fn draft<A, C>(ctx: &DaemonCtx<A, C>, params: Value) -> Result<Value, RpcError>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    let params: protocol::DraftParams = serde_json::from_value(params).map_err(invalid_params)?;
    let role = ctx.role(&params.role).map_err(runtime_rpc_error)?;
    let project = ctx.project(&params.project).map_err(runtime_rpc_error)?;
    let slug = TaskSlug::new(params.task);
    let (task, task_dir) = ctx.task_or_create(&project, &slug).map_err(runtime_rpc_error)?;
    let working_dir = DaemonCtx::<A, C>::working_dir(&project, &task_dir);

    let session = ctx
        .draft_manager
        .create_draft(&role, task, task_dir, working_dir, slug.to_string())
        .map_err(runtime_rpc_error)?;

    to_json(protocol::DraftResult {
        session_id: session.session_id.to_string(),
        task_slug: session.task_slug.to_string(),
        project: project.name.to_string(),
    })
}

async fn undraft<A, C>(ctx: &DaemonCtx<A, C>) -> Result<Value, RpcError>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    let session = ctx
        .draft_manager
        .active_session()
        .ok_or_else(|| RpcError::new(error_code::NO_ACTIVE_DRAFT, "no active draft session"))?;
    let summary = ctx.draft_manager.close_draft().map_err(runtime_rpc_error)?;

    to_json(protocol::UndraftResult {
        session_id: session.session_id.to_string(),
        task_slug: session.task_slug.to_string(),
        turns: summary.turns,
        cost: summary.cost,
        duration_ms: summary.duration_ms.max(0) as u64,
    })
}

async fn get_draft_status<A, C>(ctx: &DaemonCtx<A, C>) -> Result<Value, RpcError>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    let session = ctx.draft_manager.active_session();
    let session = session.map(to_json).transpose()?;
    to_json(protocol::DraftStatusResult { active: session.is_some(), session })
}

async fn kill_agent<A, C>(ctx: &DaemonCtx<A, C>, params: Value) -> Result<Value, RpcError>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    let params: protocol::KillAgentParams = serde_json::from_value(params).map_err(invalid_params)?;
    let id = DispatchId::new(params.agent_id.clone());
    let success = ctx.tools.kill_agent(&id);
    let message = if success {
        format!("sent cancellation to agent '{}'", params.agent_id)
    } else {
        format!("no active agent with id '{}'", params.agent_id)
    };
    to_json(protocol::KillAgentResult { success, message })
}

async fn list_agents<A, C>(ctx: &DaemonCtx<A, C>) -> Result<Value, RpcError>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    let agents = ctx.tools.list_agents().into_iter().map(to_json).collect::<Result<_, _>>()?;
    to_json(protocol::ListAgentsResult { agents })
}

async fn list_tasks<A, C>(ctx: &DaemonCtx<A, C>, params: Value) -> Result<Value, RpcError>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    let params: protocol::ListTasksParams = serde_json::from_value(params).map_err(invalid_params)?;
    let project = ProjectName::new(params.project);
    let tasks = ctx
        .tools
        .list_tasks(&project)
        .map_err(tool_surface_rpc_error)?
        .into_iter()
        .map(to_json)
        .collect::<Result<_, _>>()?;
    to_json(protocol::ListTasksResult { tasks })
}

async fn get_task_context<A, C>(ctx: &DaemonCtx<A, C>, params: Value) -> Result<Value, RpcError>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    let params: protocol::GetTaskContextParams = serde_json::from_value(params).map_err(invalid_params)?;
    let project = ProjectName::new(params.project);
    let slug = TaskSlug::new(params.slug);
    let context = ctx
        .tools
        .get_task_context(&project, &slug)
        .map_err(tool_surface_rpc_error)?;
    to_json(protocol::GetTaskContextResult { context })
}

async fn list_projects<A, C>(ctx: &DaemonCtx<A, C>) -> Result<Value, RpcError>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    let projects = collabot_store::project_manifest::list_projects(&ctx.projects_dir)
        .map_err(store_rpc_error)?
        .into_iter()
        .map(to_json)
        .collect::<Result<_, _>>()?;
    to_json(protocol::ListProjectsResult { projects })
}

async fn create_project<A, C>(ctx: &DaemonCtx<A, C>, params: Value) -> Result<Value, RpcError>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    let params: protocol::CreateProjectParams = serde_json::from_value(params).map_err(invalid_params)?;

    let mut roles = Vec::with_capacity(params.roles.len());
    for role in &params.roles {
        ctx.role(role).map_err(runtime_rpc_error)?;
        roles.push(RoleName::new(role.clone()));
    }

    let mut project = collabot_core::Project::new(params.name.clone());
    project.description = params.description;
    project.paths = vec![ctx.projects_dir.join(&params.name)];
    project.roles = roles;

    collabot_store::project_manifest::write_project(&ctx.projects_dir, &project).map_err(store_rpc_error)?;

    to_json(protocol::CreateProjectResult {
        name: project.name.to_string(),
        roles: project.roles.iter().map(|r| r.to_string()).collect(),
    })
}

/// Accepts connections on `listener`, spawning one persistent duplex handler
/// per connection (see module docs for why this departs from the teacher's
/// one-shot-per-connection model).
pub async fn serve<A, C>(listener: UnixListener, ctx: Arc<DaemonCtx<A, C>>)
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    loop {
        let (stream, _addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::error!(error = %err, "failed to accept connection");
                continue;
            }
        };
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            handle_connection(stream, ctx).await;
        });
    }
}

async fn handle_connection<A, C>(stream: UnixStream, ctx: Arc<DaemonCtx<A, C>>)
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    let (mut read_half, mut write_half) = stream.into_split();
    let (response_tx, mut response_rx) = tokio::sync::mpsc::unbounded_channel::<OutboundFrame>();
    let mut notifications = ctx.notifications.subscribe();

    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                maybe_response = response_rx.recv() => {
                    match maybe_response {
                        Some(frame) => {
                            if let Err(err) = protocol_wire::write_frame(&mut write_half, &frame, protocol_wire::DEFAULT_TIMEOUT).await {
                                tracing::debug!(error = %err, "failed to write response, closing connection");
                                break;
                            }
                        }
                        None => break,
                    }
                }
                notification = notifications.recv() => {
                    match notification {
                        Ok(notification) => {
                            let frame = OutboundFrame::Notification(notification);
                            if let Err(err) = protocol_wire::write_frame(&mut write_half, &frame, protocol_wire::DEFAULT_TIMEOUT).await {
                                tracing::debug!(error = %err, "failed to write notification, closing connection");
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "connection lagged behind notification stream");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    });

    loop {
        let request = match protocol_wire::read_message(&mut read_half).await {
            Ok(bytes) => match protocol_wire::decode::<RpcRequest>(&bytes) {
                Ok(request) => request,
                Err(err) => {
                    tracing::debug!(error = %err, "failed to decode request");
                    let error = RpcError::new(error_code::PARSE_ERROR, err.to_string());
                    let _ = response_tx.send(OutboundFrame::Response(RpcResponse::err(json!(null), error)));
                    continue;
                }
            },
            Err(ProtocolError::ConnectionClosed) => break,
            Err(err) => {
                tracing::debug!(error = %err, "connection read error");
                break;
            }
        };

        let response = handle_request(&ctx, request).await;
        if response_tx.send(OutboundFrame::Response(response)).is_err() {
            break;
        }
    }

    drop(response_tx);
    let _ = writer.await;
}
