// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatch runtime: the core loop that opens an agent subprocess for
//! one invocation, classifies its message stream into captured events, runs
//! the synchronous analyzers against a sliding window of tool activity, and
//! finalizes the dispatch envelope on every exit path (spec §4.1), grounded
//! on the teacher's message-driven per-dispatch loop
//! (`oj-engine/src/executor.rs`, `oj-engine/src/runtime/handlers/agent.rs`).

use crate::cancel::CancellationHandle;
use crate::context::build_task_context;
use crate::error::RuntimeError;
use crate::pool::AgentPool;
use crate::stall::StallTimer;
use crate::tracker::{DispatchResult, DispatchTracker};
use collabot_adapters::{AgentAdapter, AgentMessage, AgentSpawnConfig, ContentBlock, SystemSubtype};
use collabot_analyzers::{non_retryable, repetition, ErrorTriplet, ToolCallKey, ToolCallRecord};
use collabot_core::{
    truncate, normalize_whitespace, AbortReason, CapturedEvent, Clock, CorrelationId,
    DetectorKind, DispatchEnvelope, DispatchId, DispatchIndexEntry, DispatchStatus, EventId,
    EventKind, IdGen, MonotonicIdGen, ProjectName, ResultStatus, Role, RoleCategory,
    StructuredResult, Task, ToolResultStatus, UsageRecord, ERROR_SNIPPET_TRUNCATION,
    TEXT_DISPLAY_TRUNCATION,
};
use collabot_providers::ProviderRegistry;
use collabot_store::dispatch_store::{self, DispatchPatch};
use collabot_store::task_manifest::TaskLocks;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Resolves a role's model-hint alias against the instance-wide alias table
/// (spec §4.1 "Model resolution order").
#[derive(Debug, Clone, Default)]
pub struct ModelAliases(HashMap<String, String>);

impl ModelAliases {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self(aliases)
    }

    fn resolve(&self, hint: &str) -> String {
        self.0.get(hint).cloned().unwrap_or_else(|| hint.to_string())
    }
}

/// Everything the caller supplies to start one dispatch (spec §4.1 step 1).
#[derive(Debug, Clone)]
pub struct DispatchInput {
    pub prompt: String,
    pub role: Role,
    pub task: Task,
    pub project: ProjectName,
    pub task_dir: PathBuf,
    pub working_dir: PathBuf,
    pub channel: String,
    pub parent_dispatch_id: Option<DispatchId>,
    pub model_override: Option<String>,
    pub max_turns: Option<u32>,
    pub max_budget_usd: Option<f64>,
    /// Project-supplied preamble (paths, description) prepended ahead of the
    /// harness system prompt (spec §4.1 step 2 "project context additions").
    pub project_context: Option<String>,
    /// `true` for a follow-up dispatch on a task that already has prior
    /// dispatch envelopes; includes the reconstructed task-history block
    /// (spec §4.1 step 2, §4.5).
    pub include_task_history: bool,
}

const HARNESS_SYSTEM_PROMPT: &str = "You are operating inside Collabot, an orchestration layer that supervises this session. Report your outcome as a single structured result object when you are done.";

enum LoopResult {
    Completed {
        result: Option<StructuredResult>,
        raw_text: Option<String>,
        cost: Option<f64>,
        usage: Option<UsageRecord>,
    },
    Aborted(AbortReason),
    Crashed(String),
}

/// Orchestrates one agent invocation end to end. Cheap to clone: every field
/// is an `Arc`, a `Clone` id generator, or a `Clone` clock.
pub struct DispatchRuntime<A, C>
where
    A: AgentAdapter,
    C: Clock,
{
    agent: Arc<A>,
    clock: C,
    pool: Arc<AgentPool>,
    tracker: Arc<DispatchTracker>,
    providers: Arc<ProviderRegistry>,
    task_locks: TaskLocks,
    id_gen: MonotonicIdGen,
    default_model: String,
    model_aliases: ModelAliases,
}

impl<A, C> Clone for DispatchRuntime<A, C>
where
    A: AgentAdapter,
    C: Clock,
{
    fn clone(&self) -> Self {
        Self {
            agent: Arc::clone(&self.agent),
            clock: self.clock.clone(),
            pool: Arc::clone(&self.pool),
            tracker: Arc::clone(&self.tracker),
            providers: Arc::clone(&self.providers),
            task_locks: self.task_locks.clone(),
            id_gen: self.id_gen.clone(),
            default_model: self.default_model.clone(),
            model_aliases: self.model_aliases.clone(),
        }
    }
}

impl<A, C> DispatchRuntime<A, C>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent: Arc<A>,
        clock: C,
        pool: Arc<AgentPool>,
        tracker: Arc<DispatchTracker>,
        providers: Arc<ProviderRegistry>,
        task_locks: TaskLocks,
        default_model: impl Into<String>,
        model_aliases: ModelAliases,
    ) -> Self {
        Self {
            agent,
            clock,
            pool,
            tracker,
            providers,
            task_locks,
            id_gen: MonotonicIdGen::new(),
            default_model: default_model.into(),
            model_aliases,
        }
    }

    fn resolve_model(&self, input: &DispatchInput) -> String {
        if let Some(model) = &input.model_override {
            return model.clone();
        }
        if let Some(hint) = &input.role.model_hint {
            return self.model_aliases.resolve(hint);
        }
        self.default_model.clone()
    }

    /// Allocates a dispatch id, registers it with the pool and tracker,
    /// writes the initial dispatch file and manifest entry, and returns the
    /// id immediately without running the agent (spec §4.7 "begins a new
    /// dispatch asynchronously, returns the id immediately"). `run_dispatch`
    /// does the rest; callers that want the full synchronous flow should use
    /// [`DispatchRuntime::dispatch`] instead. `cancel` must be the same
    /// handle later passed to `run_dispatch` — it is the one registered with
    /// the pool, so `pool.kill(id)` has no effect unless the two calls share
    /// it.
    pub fn begin_dispatch(
        &self,
        input: &DispatchInput,
        cancel: CancellationHandle,
    ) -> Result<DispatchId, RuntimeError> {
        let dispatch_id = DispatchId::new(self.id_gen.next());
        let started_at = self.clock.now();

        self.pool.register(
            dispatch_id.clone(),
            input.role.name.clone(),
            input.task.slug.clone(),
            started_at,
            cancel,
        )?;

        let model = self.resolve_model(input);
        let envelope = DispatchEnvelope::start(
            dispatch_id.clone(),
            input.task.slug.clone(),
            input.role.name.clone(),
            model,
            input.working_dir.clone(),
            started_at,
            input.parent_dispatch_id.clone(),
        );

        if let Err(err) = dispatch_store::create_dispatch(&input.task_dir, envelope.clone()) {
            tracing::warn!(dispatch_id = %dispatch_id, error = %err, "failed to create dispatch file");
        }

        let task = input.task.clone();
        let entry = DispatchIndexEntry {
            dispatch_id: dispatch_id.clone(),
            role: input.role.name.clone(),
            status: DispatchStatus::Running,
            cost: None,
            started_at,
            parent_dispatch_id: input.parent_dispatch_id.clone(),
        };
        if let Err(err) =
            self.task_locks
                .upsert_dispatch_entry(&input.task_dir, move || task.clone(), entry)
        {
            tracing::warn!(dispatch_id = %dispatch_id, error = %err, "failed to update task manifest");
        }

        emit_sync(
            &input.task_dir,
            &dispatch_id,
            &self.id_gen,
            &self.clock,
            EventKind::SessionInit { session_id: None },
        );

        self.tracker.track(dispatch_id.clone(), input.role.name.clone());

        Ok(dispatch_id)
    }

    /// Runs the agent to completion (or abort, or crash) and finalizes the
    /// dispatch. Safe to call from a spawned task: `begin_dispatch` must have
    /// already registered `dispatch_id` with the pool and tracker.
    pub async fn run_dispatch(
        &self,
        dispatch_id: DispatchId,
        input: DispatchInput,
        cancel: CancellationHandle,
    ) -> DispatchResult {
        let started_at = self.clock.now();
        let stall = StallTimer::spawn(input.role.category, cancel.clone());

        let system_prompt = self.compose_system_prompt(&input);
        let spawn_config = AgentSpawnConfig {
            prompt: input.prompt.clone(),
            workspace: input.working_dir.clone(),
            system_prompt: Some(system_prompt),
            model_hint: input.role.model_hint.clone(),
            resume_session_id: None,
            allowed_tools: None,
            max_turns: if matches!(input.role.category, RoleCategory::Conversational) {
                None
            } else {
                input.max_turns
            },
            max_budget_usd: if matches!(input.role.category, RoleCategory::Conversational) {
                None
            } else {
                input.max_budget_usd
            },
        };

        let agent = Arc::clone(&self.agent);
        let task_dir = input.task_dir.clone();
        let loop_dispatch_id = dispatch_id.clone();
        let loop_cancel = cancel.clone();
        let id_gen = self.id_gen.clone();
        let clock = self.clock.clone();
        let stall_reset = stall.resetter();
        let channel = input.channel.clone();

        let providers = Arc::clone(&self.providers);
        let loop_handle = tokio::spawn(async move {
            run_agent_loop(
                agent,
                spawn_config,
                task_dir,
                loop_dispatch_id,
                loop_cancel,
                id_gen,
                clock,
                stall_reset,
                channel,
                providers,
            )
            .await
        });

        let loop_result = match loop_handle.await {
            Ok(result) => result,
            Err(join_err) => {
                tracing::error!(dispatch_id = %dispatch_id, error = %join_err, "dispatch loop panicked");
                LoopResult::Crashed("internal error: dispatch loop panicked".into())
            }
        };

        stall.stop();
        self.finalize(dispatch_id, input, started_at, loop_result).await
    }

    /// Convenience wrapper for callers that want to start and await a
    /// dispatch in one call (the normal `handleTask` path).
    pub async fn dispatch(
        &self,
        input: DispatchInput,
        cancel: CancellationHandle,
    ) -> Result<DispatchResult, RuntimeError> {
        let dispatch_id = self.begin_dispatch(&input, cancel.clone())?;
        Ok(self.run_dispatch(dispatch_id, input, cancel).await)
    }

    fn compose_system_prompt(&self, input: &DispatchInput) -> String {
        let mut parts = Vec::new();
        if let Some(context) = &input.project_context {
            parts.push(context.clone());
        }
        parts.push(HARNESS_SYSTEM_PROMPT.to_string());
        parts.push(input.role.system_prompt.clone());
        if input.include_task_history {
            match dispatch_store::get_dispatch_envelopes(&input.task_dir) {
                Ok(envelopes) => parts.push(build_task_context(&input.task, &envelopes)),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to reconstruct task context");
                }
            }
        }
        parts.join("\n\n")
    }

    async fn finalize(
        &self,
        dispatch_id: DispatchId,
        input: DispatchInput,
        started_at: chrono::DateTime<chrono::Utc>,
        loop_result: LoopResult,
    ) -> DispatchResult {
        let completed_at = self.clock.now();
        let duration_ms = (completed_at - started_at).num_milliseconds().max(0);

        let (status, abort_reason, result, raw_text, cost, usage, error) = match loop_result {
            LoopResult::Completed {
                result,
                raw_text,
                cost,
                usage,
            } => (DispatchStatus::Completed, None, result, raw_text, cost, usage, None),
            LoopResult::Aborted(reason) => {
                let msg = format!("dispatch aborted: {reason:?}");
                (DispatchStatus::Aborted, Some(reason), None, None, None, None, Some(msg))
            }
            LoopResult::Crashed(msg) => {
                (DispatchStatus::Crashed, None, None, None, None, None, Some(msg))
            }
        };

        let summary_status = result.as_ref().map(|r| r.status).unwrap_or(ResultStatus::Failed);
        emit_sync(
            &input.task_dir,
            &dispatch_id,
            &self.id_gen,
            &self.clock,
            EventKind::SessionComplete {
                status: summary_status,
                summary: result.as_ref().map(|r| r.summary.clone()).or_else(|| error.clone()),
            },
        );

        let patch = DispatchPatch {
            status: Some(status),
            completed_at: Some(completed_at),
            abort_reason,
            cost,
            usage,
            result: result.clone(),
            raw_result_text: raw_text.clone(),
        };
        if let Err(err) = dispatch_store::update_dispatch(&input.task_dir, &dispatch_id, patch) {
            tracing::warn!(dispatch_id = %dispatch_id, error = %err, "failed to finalize dispatch file");
        }

        let task = input.task.clone();
        let entry = DispatchIndexEntry {
            dispatch_id: dispatch_id.clone(),
            role: input.role.name.clone(),
            status,
            cost,
            started_at,
            parent_dispatch_id: input.parent_dispatch_id.clone(),
        };
        if let Err(err) =
            self.task_locks
                .upsert_dispatch_entry(&input.task_dir, move || task.clone(), entry)
        {
            tracing::warn!(dispatch_id = %dispatch_id, error = %err, "failed to finalize task manifest");
        }

        let channel_status = match status {
            DispatchStatus::Completed => collabot_core::ChannelStatus::Completed,
            _ => collabot_core::ChannelStatus::Failed,
        };
        let body = result
            .as_ref()
            .map(|r| r.summary.clone())
            .or_else(|| raw_text.clone())
            .or_else(|| error.clone())
            .unwrap_or_default();
        self.providers
            .broadcast(collabot_core::ChannelMessage::new(
                input.channel.clone(),
                collabot_core::ChannelMessageType::Result,
                body,
            ))
            .await;
        self.providers
            .broadcast_dispatch_status(input.channel.clone(), channel_status)
            .await;

        self.pool.release(&dispatch_id);

        let dispatch_result = DispatchResult {
            dispatch_id: dispatch_id.clone(),
            status,
            result,
            raw_text,
            cost,
            duration_ms,
            error,
        };
        self.tracker.complete(&dispatch_id, dispatch_result.clone());
        dispatch_result
    }
}

fn emit_sync(
    task_dir: &std::path::Path,
    dispatch_id: &DispatchId,
    id_gen: &MonotonicIdGen,
    clock: &impl Clock,
    kind: EventKind,
) {
    let event = CapturedEvent::new(EventId::new(id_gen.next()), clock.now(), kind);
    if let Err(err) = dispatch_store::append_event(task_dir, dispatch_id, event) {
        tracing::warn!(dispatch_id = %dispatch_id, error = %err, "failed to append event");
    }
}

fn extract_target(tool: &str, input: &serde_json::Value) -> Option<String> {
    let field = match tool {
        "Read" | "Edit" | "Write" | "MultiEdit" | "NotebookEdit" => "file_path",
        "Bash" => "command",
        "Grep" => "pattern",
        _ => return None,
    };
    input.get(field).and_then(|v| v.as_str()).map(String::from)
}

fn tool_input_metadata(input: &serde_json::Value) -> HashMap<String, serde_json::Value> {
    input.as_object().cloned().unwrap_or_default().into_iter().collect()
}

fn truncate_for_display(text: &str) -> (String, bool) {
    (truncate(text, TEXT_DISPLAY_TRUNCATION), text.len() > TEXT_DISPLAY_TRUNCATION)
}

fn abort_reason_for(kind: DetectorKind) -> AbortReason {
    match kind {
        DetectorKind::Repeat => AbortReason::ErrorLoop,
        DetectorKind::PingPong => AbortReason::PingPong,
        DetectorKind::NonRetryable => AbortReason::NonRetryableError,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_agent_loop<A, C>(
    agent: Arc<A>,
    spawn_config: AgentSpawnConfig,
    task_dir: PathBuf,
    dispatch_id: DispatchId,
    cancel: CancellationHandle,
    id_gen: MonotonicIdGen,
    clock: C,
    stall_reset: tokio::sync::mpsc::Sender<()>,
    channel: String,
    providers: Arc<ProviderRegistry>,
) -> LoopResult
where
    A: AgentAdapter,
    C: Clock,
{
    let mut handle = match agent.spawn(spawn_config).await {
        Ok(handle) => handle,
        Err(err) => return LoopResult::Crashed(format!("failed to start agent: {err}")),
    };

    let mut repetition_window = collabot_analyzers::new_repetition_window();
    let mut error_window = collabot_analyzers::new_non_retryable_window();
    let mut pending_calls: HashMap<CorrelationId, ToolCallKey> = HashMap::new();
    let mut warned = false;

    loop {
        if cancel.is_cancelled() {
            if let Ok(msg) = handle.messages.try_recv() {
                if let Some(terminal) = handle_message(
                    msg,
                    &task_dir,
                    &dispatch_id,
                    &id_gen,
                    &clock,
                    &channel,
                    &mut repetition_window,
                    &mut error_window,
                    &mut pending_calls,
                    &mut warned,
                    &cancel,
                    &stall_reset,
                    &providers,
                )
                .await
                {
                    return LoopResult::Completed {
                        result: terminal.0,
                        raw_text: terminal.1,
                        cost: terminal.2,
                        usage: terminal.3,
                    };
                }
                continue;
            }
            return LoopResult::Aborted(cancel.reason().unwrap_or(AbortReason::External));
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                continue;
            }
            maybe_msg = handle.messages.recv() => {
                let Some(msg) = maybe_msg else {
                    if cancel.is_cancelled() {
                        return LoopResult::Aborted(cancel.reason().unwrap_or(AbortReason::External));
                    }
                    return LoopResult::Crashed(
                        "agent stream ended without a terminal result message".into(),
                    );
                };
                if let Some(terminal) = handle_message(
                    msg,
                    &task_dir,
                    &dispatch_id,
                    &id_gen,
                    &clock,
                    &channel,
                    &mut repetition_window,
                    &mut error_window,
                    &mut pending_calls,
                    &mut warned,
                    &cancel,
                    &stall_reset,
                    &providers,
                )
                .await
                {
                    return LoopResult::Completed {
                        result: terminal.0,
                        raw_text: terminal.1,
                        cost: terminal.2,
                        usage: terminal.3,
                    };
                }
            }
        }
    }
}

type TerminalFields = (
    Option<StructuredResult>,
    Option<String>,
    Option<f64>,
    Option<UsageRecord>,
);

/// Classifies one agent message into captured events, running the
/// analyzers where the protocol calls for it (spec §4.1 step 3). Returns
/// `Some` terminal fields when `msg` was the agent's final result message.
#[allow(clippy::too_many_arguments)]
async fn handle_message(
    msg: AgentMessage,
    task_dir: &std::path::Path,
    dispatch_id: &DispatchId,
    id_gen: &MonotonicIdGen,
    clock: &impl Clock,
    channel: &str,
    repetition_window: &mut collabot_analyzers::RepetitionWindow,
    error_window: &mut collabot_analyzers::NonRetryableWindow,
    pending_calls: &mut HashMap<CorrelationId, ToolCallKey>,
    warned: &mut bool,
    cancel: &CancellationHandle,
    stall_reset: &tokio::sync::mpsc::Sender<()>,
    providers: &ProviderRegistry,
) -> Option<TerminalFields> {
    let _ = stall_reset.try_send(());

    match msg {
        AgentMessage::Assistant { content } => {
            let mut calls = Vec::new();
            for block in content {
                match block {
                    ContentBlock::Text { text } => {
                        let (display, truncated) = truncate_for_display(&text);
                        emit_sync(
                            task_dir,
                            dispatch_id,
                            id_gen,
                            clock,
                            EventKind::AgentText {
                                text: display.clone(),
                                truncated,
                            },
                        );
                        providers
                            .broadcast(collabot_core::ChannelMessage::new(
                                channel,
                                collabot_core::ChannelMessageType::Chat,
                                display,
                            ))
                            .await;
                    }
                    ContentBlock::Thinking { thinking } => {
                        let (display, truncated) = truncate_for_display(&thinking);
                        emit_sync(
                            task_dir,
                            dispatch_id,
                            id_gen,
                            clock,
                            EventKind::AgentThinking {
                                text: display,
                                truncated,
                            },
                        );
                    }
                    ContentBlock::ToolUse { id, name, input } => {
                        let correlation_id = CorrelationId::new(id);
                        let target = extract_target(&name, &input);
                        let key = ToolCallKey {
                            tool: name.clone(),
                            target: target.clone(),
                        };
                        pending_calls.insert(correlation_id.clone(), key.clone());
                        calls.push(ToolCallRecord {
                            key,
                            timestamp: clock.now(),
                        });
                        let tool_use_body = match &target {
                            Some(target) => format!("{name}: {target}"),
                            None => name.clone(),
                        };
                        emit_sync(
                            task_dir,
                            dispatch_id,
                            id_gen,
                            clock,
                            EventKind::AgentToolCall {
                                correlation_id,
                                tool: name,
                                target,
                                metadata: tool_input_metadata(&input),
                            },
                        );
                        providers
                            .broadcast(collabot_core::ChannelMessage::new(
                                channel,
                                collabot_core::ChannelMessageType::ToolUse,
                                tool_use_body,
                            ))
                            .await;
                    }
                    ContentBlock::ToolResult { .. } => {}
                }
            }

            for call in calls {
                repetition_window.push(call);
            }
            if let Some(verdict) = repetition::analyze(repetition_window) {
                match verdict {
                    collabot_analyzers::Verdict::Warning(kind) => {
                        let message = format!("agent appears stuck in a loop: {kind:?}");
                        emit_sync(
                            task_dir,
                            dispatch_id,
                            id_gen,
                            clock,
                            EventKind::HarnessWarning {
                                detector: kind,
                                message: message.clone(),
                            },
                        );
                        // Spec §4.1 step 4: broadcast once, set a flag, do not
                        // interrupt. Without the flag the repetition window
                        // keeps re-triggering a Warning verdict on every
                        // subsequent message until the pair count escalates
                        // to a kill.
                        if !*warned {
                            providers
                                .broadcast(collabot_core::ChannelMessage::new(
                                    channel,
                                    collabot_core::ChannelMessageType::Warning,
                                    message,
                                ))
                                .await;
                            *warned = true;
                        }
                    }
                    collabot_analyzers::Verdict::Kill(kind) => {
                        let reason = abort_reason_for(kind);
                        cancel.cancel(reason);
                        emit_sync(
                            task_dir,
                            dispatch_id,
                            id_gen,
                            clock,
                            EventKind::HarnessKill {
                                detector: Some(kind),
                                reason,
                            },
                        );
                    }
                }
            }
            None
        }
        AgentMessage::User { content } => {
            for block in content {
                if let ContentBlock::ToolResult {
                    tool_use_id,
                    is_error,
                    content,
                    duration_ms,
                } = block
                {
                    let correlation_id = CorrelationId::new(tool_use_id);
                    let status = if is_error {
                        ToolResultStatus::Error
                    } else {
                        ToolResultStatus::Completed
                    };
                    let error_snippet = if is_error {
                        Some(normalize_whitespace(&truncate(&content, ERROR_SNIPPET_TRUNCATION)))
                    } else {
                        None
                    };
                    emit_sync(
                        task_dir,
                        dispatch_id,
                        id_gen,
                        clock,
                        EventKind::AgentToolResult {
                            correlation_id: correlation_id.clone(),
                            status,
                            duration_ms,
                            error_snippet: error_snippet.clone(),
                        },
                    );

                    if is_error {
                        if let Some(key) = pending_calls.get(&correlation_id) {
                            error_window.push(ErrorTriplet {
                                tool: key.tool.clone(),
                                target: key.target.clone(),
                                error_snippet: error_snippet.unwrap_or_default(),
                            });
                            if let Some(_triplet) = non_retryable::analyze(error_window) {
                                cancel.cancel(AbortReason::NonRetryableError);
                                emit_sync(
                                    task_dir,
                                    dispatch_id,
                                    id_gen,
                                    clock,
                                    EventKind::HarnessKill {
                                        detector: Some(DetectorKind::NonRetryable),
                                        reason: AbortReason::NonRetryableError,
                                    },
                                );
                            }
                        }
                    }
                }
            }
            None
        }
        AgentMessage::System {
            subtype,
            session_id,
            detail,
            paths,
        } => {
            let kind = match subtype {
                SystemSubtype::Init => EventKind::SessionInit { session_id },
                SystemSubtype::CompactBoundary => EventKind::SessionCompaction,
                SystemSubtype::RateLimit => EventKind::SessionRateLimit { detail },
                SystemSubtype::FilesPersisted => EventKind::SystemFilesPersisted { paths },
                SystemSubtype::Hook => EventKind::SystemHook {
                    name: detail.clone().unwrap_or_default(),
                    detail,
                },
                SystemSubtype::Status => EventKind::SystemStatus {
                    message: detail.unwrap_or_default(),
                },
            };
            emit_sync(task_dir, dispatch_id, id_gen, clock, kind);
            None
        }
        AgentMessage::Result {
            result,
            raw_text,
            cost_usd,
            input_tokens,
            output_tokens,
            cache_tokens,
            context_window,
            max_output_tokens,
            metadata: _,
        } => {
            let usage = Some(UsageRecord {
                input_tokens,
                output_tokens,
                cache_tokens,
                context_window,
                max_output: max_output_tokens,
            });
            let cost = Some(cost_usd);
            match result.and_then(|v| serde_json::from_value::<StructuredResult>(v).ok()) {
                Some(structured) => Some((Some(structured), None, cost, usage)),
                None => Some((None, Some(raw_text), cost, usage)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabot_adapters::FakeAgentAdapter;
    use collabot_core::{FakeClock, ProjectName, Role, RoleCategory, ToolSetPermission};

    fn role() -> Role {
        Role::new("worker", "you write code", RoleCategory::Coding).with_permissions(ToolSetPermission::Full)
    }

    fn input(task_dir: PathBuf) -> DispatchInput {
        DispatchInput {
            prompt: "fix the bug".into(),
            role: role(),
            task: Task::new("task-1", "proj", "Fix bug", chrono::Utc::now()),
            project: ProjectName::new("proj"),
            task_dir,
            working_dir: std::env::temp_dir(),
            channel: "chan-1".into(),
            parent_dispatch_id: None,
            model_override: None,
            max_turns: Some(20),
            max_budget_usd: Some(5.0),
            project_context: None,
            include_task_history: false,
        }
    }

    fn runtime(
        adapter: Arc<FakeAgentAdapter>,
    ) -> DispatchRuntime<FakeAgentAdapter, FakeClock> {
        let clock = FakeClock::new(chrono::Utc::now());
        DispatchRuntime::new(
            adapter,
            clock,
            Arc::new(AgentPool::new(None)),
            Arc::new(DispatchTracker::new()),
            Arc::new(ProviderRegistry::new()),
            TaskLocks::new(),
            "default-model",
            ModelAliases::default(),
        )
    }

    #[tokio::test]
    async fn successful_dispatch_completes_with_structured_result() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = Arc::new(FakeAgentAdapter::new());
        adapter.push_script(vec![
            AgentMessage::Assistant {
                content: vec![ContentBlock::Text {
                    text: "working on it".into(),
                }],
            },
            AgentMessage::Result {
                result: Some(serde_json::json!({
                    "status": "success",
                    "summary": "fixed it",
                })),
                raw_text: "fixed it".into(),
                cost_usd: 0.42,
                input_tokens: 100,
                output_tokens: 50,
                cache_tokens: 0,
                context_window: 200_000,
                max_output_tokens: 8192,
                metadata: Default::default(),
            },
        ]);

        let rt = runtime(adapter);
        let outcome = rt
            .dispatch(input(dir.path().to_path_buf()), CancellationHandle::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, DispatchStatus::Completed);
        assert_eq!(outcome.result.unwrap().status, ResultStatus::Success);
        assert!((outcome.cost.unwrap() - 0.42).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn repeated_tool_calls_abort_the_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = Arc::new(FakeAgentAdapter::new());
        let mut script = Vec::new();
        for _ in 0..5 {
            script.push(AgentMessage::Assistant {
                content: vec![ContentBlock::ToolUse {
                    id: "t1".into(),
                    name: "Bash".into(),
                    input: serde_json::json!({"command": "dotnet build"}),
                }],
            });
        }
        adapter.push_script(script);

        let rt = runtime(adapter);
        let outcome = rt
            .dispatch(input(dir.path().to_path_buf()), CancellationHandle::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, DispatchStatus::Aborted);
    }

    #[tokio::test]
    async fn agent_stream_ending_without_result_crashes() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = Arc::new(FakeAgentAdapter::new());
        adapter.push_script(vec![AgentMessage::Assistant {
            content: vec![ContentBlock::Text {
                text: "incomplete".into(),
            }],
        }]);

        let rt = runtime(adapter);
        let outcome = rt
            .dispatch(input(dir.path().to_path_buf()), CancellationHandle::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, DispatchStatus::Crashed);
    }

    #[tokio::test]
    async fn unparseable_result_falls_back_to_raw_text() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = Arc::new(FakeAgentAdapter::new());
        adapter.push_script(vec![AgentMessage::Result {
            result: Some(serde_json::json!({"not": "a result"})),
            raw_text: "done anyway".into(),
            cost_usd: 0.0,
            input_tokens: 0,
            output_tokens: 0,
            cache_tokens: 0,
            context_window: 0,
            max_output_tokens: 0,
            metadata: Default::default(),
        }]);

        let rt = runtime(adapter);
        let outcome = rt
            .dispatch(input(dir.path().to_path_buf()), CancellationHandle::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, DispatchStatus::Completed);
        assert!(outcome.result.is_none());
        assert_eq!(outcome.raw_text.as_deref(), Some("done anyway"));
    }

    #[tokio::test]
    async fn pool_at_capacity_fails_before_any_dispatch_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = Arc::new(FakeAgentAdapter::new());
        let clock = FakeClock::new(chrono::Utc::now());
        let pool = Arc::new(AgentPool::new(Some(1)));
        pool.register(
            DispatchId::new("occupying-slot"),
            collabot_core::RoleName::new("worker"),
            collabot_core::TaskSlug::new("other-task"),
            clock.now(),
            CancellationHandle::new(),
        )
        .unwrap();

        let rt = DispatchRuntime::new(
            adapter,
            clock,
            pool,
            Arc::new(DispatchTracker::new()),
            Arc::new(ProviderRegistry::new()),
            TaskLocks::new(),
            "default-model",
            ModelAliases::default(),
        );

        let err = rt
            .dispatch(input(dir.path().to_path_buf()), CancellationHandle::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::PoolAtCapacity));
        assert!(!dir.path().join("dispatches").exists());
    }
}
