// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Draft-session manager (spec §4.8): a single long-lived dispatch that
//! resumes across many conversational turns, one dispatch envelope for the
//! whole session's lifetime rather than one per turn. Restart recovery
//! (`load_active_draft`) and the single-active-draft invariant are both
//! enforced by the same instance-wide `Mutex<Option<ActiveDraft>>` (spec §3,
//! §5 "The draft-session manager allows at most one active session,
//! protected by an instance-wide flag").

use crate::cancel::CancellationHandle;
use crate::error::RuntimeError;
use crate::pool::AgentPool;
use collabot_adapters::{AgentAdapter, AgentMessage, AgentSpawnConfig, ContentBlock, SystemSubtype};
use collabot_core::event::{truncate, TEXT_DISPLAY_TRUNCATION};
use collabot_core::{
    CapturedEvent, ChannelMessage, ChannelMessageType, ChannelStatus, Clock, DispatchEnvelope,
    DispatchId, DispatchIndexEntry, DispatchStatus, EventId, EventKind, IdGen, MonotonicIdGen,
    Role, StructuredResult, Task, UsageRecord,
};
use collabot_providers::ProviderRegistry;
use collabot_store::{dispatch_store, draft_store, task_manifest::TaskLocks};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use collabot_core::DraftSession;

struct ActiveDraft {
    session: DraftSession,
    dispatch_id: DispatchId,
    task: Task,
    task_dir: PathBuf,
    #[allow(dead_code)]
    cancel: CancellationHandle,
}

/// Outcome of one `resume_draft` turn (spec §4.8 `resumeDraft`).
#[derive(Debug, Clone)]
pub struct DraftTurnOutcome {
    pub result: Option<StructuredResult>,
    pub raw_text: Option<String>,
    pub cost: f64,
    pub session: DraftSession,
}

/// Outcome of `close_draft` (spec §4.8 `closeDraft`: "returns `{turns, cost,
/// duration}`").
#[derive(Debug, Clone, Copy)]
pub struct DraftCloseSummary {
    pub turns: u32,
    pub cost: f64,
    pub duration_ms: i64,
}

/// Owns the single active draft session, if any (spec §4.8).
pub struct DraftManager<A, C>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    agent: Arc<A>,
    clock: C,
    pool: Arc<AgentPool>,
    providers: Arc<ProviderRegistry>,
    task_locks: TaskLocks,
    id_gen: MonotonicIdGen,
    default_model: String,
    active: Mutex<Option<ActiveDraft>>,
}

impl<A, C> DraftManager<A, C>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent: Arc<A>,
        clock: C,
        pool: Arc<AgentPool>,
        providers: Arc<ProviderRegistry>,
        task_locks: TaskLocks,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            clock,
            pool,
            providers,
            task_locks,
            id_gen: MonotonicIdGen::new(),
            default_model: default_model.into(),
            active: Mutex::new(None),
        }
    }

    /// `createDraft(role, project, task, channel)` (spec §4.8). Fails with
    /// `DraftAlreadyActive` if any active draft exists instance-wide.
    pub fn create_draft(
        &self,
        role: &Role,
        task: Task,
        task_dir: PathBuf,
        working_dir: PathBuf,
        channel: impl Into<String>,
    ) -> Result<DraftSession, RuntimeError> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(RuntimeError::DraftAlreadyActive);
        }

        let now = self.clock.now();
        let dispatch_id = DispatchId::new(self.id_gen.next());
        let cancel = CancellationHandle::new();

        self.pool.register(
            dispatch_id.clone(),
            role.name.clone(),
            task.slug.clone(),
            now,
            cancel.clone(),
        )?;

        let model = role.model_hint.clone().unwrap_or_else(|| self.default_model.clone());
        let envelope = DispatchEnvelope::start(
            dispatch_id.clone(),
            task.slug.clone(),
            role.name.clone(),
            model,
            working_dir,
            now,
            None,
        );
        dispatch_store::create_dispatch(&task_dir, envelope)?;

        let entry = DispatchIndexEntry {
            dispatch_id: dispatch_id.clone(),
            role: role.name.clone(),
            status: DispatchStatus::Running,
            cost: None,
            started_at: now,
            parent_dispatch_id: None,
        };
        let task_for_default = task.clone();
        self.task_locks
            .upsert_dispatch_entry(&task_dir, move || task_for_default, entry)?;

        let session = DraftSession::new(
            collabot_core::DraftSessionId::new(self.id_gen.next()),
            role.name.clone(),
            task.slug.clone(),
            channel,
            now,
        );
        draft_store::write_draft(&task_dir, &session)?;

        *active = Some(ActiveDraft {
            session: session.clone(),
            dispatch_id,
            task,
            task_dir,
            cancel,
        });

        Ok(session)
    }

    /// `resumeDraft(session, prompt)` (spec §4.8): runs one turn using the
    /// agent's session-resume facility, streams `agent:*` events into the
    /// session's single dispatch envelope, updates session metrics from the
    /// final result message, persists `draft.json`, and broadcasts a
    /// `draft_status` notification.
    pub async fn resume_draft(
        &self,
        role: &Role,
        working_dir: PathBuf,
        prompt: String,
    ) -> Result<DraftTurnOutcome, RuntimeError> {
        let (dispatch_id, task_dir, channel) = {
            let active = self.active.lock();
            let state = active.as_ref().ok_or(RuntimeError::NoActiveDraft)?;
            (state.dispatch_id.clone(), state.task_dir.clone(), state.session.channel_id.clone())
        };

        let resume_session_id = last_agent_session_id(&task_dir, &dispatch_id)?;

        self.emit(&task_dir, &dispatch_id, EventKind::UserPrompt { text: prompt.clone() });

        let spawn_config = AgentSpawnConfig {
            prompt,
            workspace: working_dir,
            system_prompt: Some(role.system_prompt.clone()),
            model_hint: role.model_hint.clone(),
            resume_session_id,
            allowed_tools: None,
            max_turns: None,
            max_budget_usd: None,
        };

        let mut handle = self.agent.spawn(spawn_config).await?;

        let mut cost = 0.0;
        let mut usage = UsageRecord::default();
        let mut result: Option<StructuredResult> = None;
        let mut raw_text: Option<String> = None;

        while let Some(msg) = handle.messages.recv().await {
            match msg {
                AgentMessage::Assistant { content } => {
                    for block in content {
                        match block {
                            ContentBlock::Text { text } => {
                                let truncated = text.len() > TEXT_DISPLAY_TRUNCATION;
                                let display = truncate(&text, TEXT_DISPLAY_TRUNCATION);
                                self.emit(
                                    &task_dir,
                                    &dispatch_id,
                                    EventKind::AgentText {
                                        text: display.clone(),
                                        truncated,
                                    },
                                );
                                self.providers
                                    .broadcast(ChannelMessage::new(
                                        channel.clone(),
                                        ChannelMessageType::Chat,
                                        display,
                                    ))
                                    .await;
                            }
                            ContentBlock::Thinking { thinking } => {
                                let truncated = thinking.len() > TEXT_DISPLAY_TRUNCATION;
                                self.emit(
                                    &task_dir,
                                    &dispatch_id,
                                    EventKind::AgentThinking {
                                        text: truncate(&thinking, TEXT_DISPLAY_TRUNCATION),
                                        truncated,
                                    },
                                );
                            }
                            ContentBlock::ToolUse { id, name, input } => {
                                self.emit(
                                    &task_dir,
                                    &dispatch_id,
                                    EventKind::AgentToolCall {
                                        correlation_id: collabot_core::CorrelationId::new(id),
                                        tool: name,
                                        target: None,
                                        metadata: input.as_object().cloned().unwrap_or_default().into_iter().collect(),
                                    },
                                );
                            }
                            ContentBlock::ToolResult { .. } => {}
                        }
                    }
                }
                AgentMessage::User { content } => {
                    for block in content {
                        if let ContentBlock::ToolResult {
                            tool_use_id,
                            is_error,
                            duration_ms,
                            ..
                        } = block
                        {
                            self.emit(
                                &task_dir,
                                &dispatch_id,
                                EventKind::AgentToolResult {
                                    correlation_id: collabot_core::CorrelationId::new(tool_use_id),
                                    status: if is_error {
                                        collabot_core::ToolResultStatus::Error
                                    } else {
                                        collabot_core::ToolResultStatus::Completed
                                    },
                                    duration_ms,
                                    error_snippet: None,
                                },
                            );
                        }
                    }
                }
                AgentMessage::System {
                    subtype,
                    session_id,
                    detail,
                    paths,
                } => {
                    match subtype {
                        SystemSubtype::Init => {
                            self.emit(&task_dir, &dispatch_id, EventKind::SessionInit { session_id });
                        }
                        SystemSubtype::CompactBoundary => {
                            self.emit(&task_dir, &dispatch_id, EventKind::SessionCompaction);
                            self.providers
                                .broadcast(ChannelMessage::new(
                                    channel.clone(),
                                    ChannelMessageType::ContextCompacted,
                                    "context compacted",
                                ))
                                .await;
                        }
                        SystemSubtype::RateLimit => {
                            self.emit(&task_dir, &dispatch_id, EventKind::SessionRateLimit { detail });
                        }
                        SystemSubtype::FilesPersisted => {
                            self.emit(&task_dir, &dispatch_id, EventKind::SystemFilesPersisted { paths });
                        }
                        SystemSubtype::Hook => {
                            self.emit(
                                &task_dir,
                                &dispatch_id,
                                EventKind::SystemHook {
                                    name: detail.clone().unwrap_or_default(),
                                    detail,
                                },
                            );
                        }
                        SystemSubtype::Status => {
                            self.emit(
                                &task_dir,
                                &dispatch_id,
                                EventKind::SystemStatus {
                                    message: detail.unwrap_or_default(),
                                },
                            );
                        }
                    }
                }
                AgentMessage::Result {
                    result: r,
                    raw_text: rt,
                    cost_usd,
                    input_tokens,
                    output_tokens,
                    cache_tokens,
                    context_window,
                    max_output_tokens,
                    metadata: _,
                } => {
                    cost = cost_usd;
                    usage = UsageRecord {
                        input_tokens,
                        output_tokens,
                        cache_tokens,
                        context_window,
                        max_output: max_output_tokens,
                    };
                    result = r.and_then(|v| serde_json::from_value::<StructuredResult>(v).ok());
                    if result.is_none() {
                        raw_text = Some(rt);
                    }
                    break;
                }
            }
        }

        let now = self.clock.now();
        self.emit(
            &task_dir,
            &dispatch_id,
            EventKind::SessionComplete {
                status: result.as_ref().map(|r| r.status).unwrap_or(collabot_core::ResultStatus::Partial),
                summary: result.as_ref().map(|r| r.summary.clone()).or_else(|| raw_text.clone()),
            },
        );

        let session = {
            let mut active = self.active.lock();
            let state = active.as_mut().ok_or(RuntimeError::NoActiveDraft)?;
            state.session.record_turn(
                now,
                cost,
                usage.input_tokens,
                usage.output_tokens,
                usage.context_window,
                usage.max_output,
            );
            draft_store::write_draft(&state.task_dir, &state.session)?;
            state.session.clone()
        };

        self.providers.broadcast_status(channel, ChannelStatus::Running).await;

        Ok(DraftTurnOutcome {
            result,
            raw_text,
            cost,
            session,
        })
    }

    /// `getDraftStatus()` (spec §6 `get_draft_status`): a non-mutating read
    /// of the currently active session, if any.
    pub fn active_session(&self) -> Option<DraftSession> {
        self.active.lock().as_ref().map(|state| state.session.clone())
    }

    /// `closeDraft(session)` (spec §4.8): releases from the pool, sets
    /// `draft.json` status to `closed`, returns `{turns, cost, duration}`.
    pub fn close_draft(&self) -> Result<DraftCloseSummary, RuntimeError> {
        let mut state = {
            let mut active = self.active.lock();
            active.take().ok_or(RuntimeError::NoActiveDraft)?
        };

        let now = self.clock.now();
        state.session.close();
        draft_store::write_draft(&state.task_dir, &state.session)?;

        dispatch_store::update_dispatch(
            &state.task_dir,
            &state.dispatch_id,
            dispatch_store::DispatchPatch {
                status: Some(DispatchStatus::Completed),
                completed_at: Some(now),
                cost: Some(state.session.cumulative_cost_usd),
                ..Default::default()
            },
        )?;

        let entry = DispatchIndexEntry {
            dispatch_id: state.dispatch_id.clone(),
            role: state.session.role.clone(),
            status: DispatchStatus::Completed,
            cost: Some(state.session.cumulative_cost_usd),
            started_at: state.session.started_at,
            parent_dispatch_id: None,
        };
        let task = state.task.clone();
        self.task_locks
            .upsert_dispatch_entry(&state.task_dir, move || task, entry)?;

        self.pool.release(&state.dispatch_id);

        Ok(DraftCloseSummary {
            turns: state.session.turn_count,
            cost: state.session.cumulative_cost_usd,
            duration_ms: (now - state.session.started_at).num_milliseconds().max(0),
        })
    }

    /// `loadActiveDraft(projectsDir)` (spec §4.8): on startup, scans every
    /// task for a `draft.json` with status `active` and reconstructs it in
    /// memory. The session's dispatch id is not part of the persisted
    /// `draft.json` schema (spec §6) — it is recovered from the task
    /// manifest's dispatch index, where the draft's entry is the sole one
    /// still `running` (it is never finalized until `closeDraft`).
    pub fn load_active_draft(&self, projects_dir: &Path) -> Result<Option<DraftSession>, RuntimeError> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(RuntimeError::DraftAlreadyActive);
        }

        let Some((task_dir, session)) = draft_store::scan_active_draft(projects_dir)? else {
            return Ok(None);
        };

        let task = collabot_store::task_manifest::read_task(&task_dir)?
            .ok_or_else(|| RuntimeError::TaskNotFound(session.task_slug.to_string()))?;
        let dispatch_id = task
            .dispatches
            .iter()
            .rev()
            .find(|e| !e.status.is_terminal())
            .map(|e| e.dispatch_id.clone())
            .ok_or_else(|| RuntimeError::DispatchNotFound(session.session_id.to_string()))?;

        let cancel = CancellationHandle::new();
        self.pool.register(
            dispatch_id.clone(),
            session.role.clone(),
            session.task_slug.clone(),
            session.started_at,
            cancel.clone(),
        )?;

        let restored = session.clone();
        *active = Some(ActiveDraft {
            session,
            dispatch_id,
            task,
            task_dir,
            cancel,
        });

        Ok(Some(restored))
    }

    fn emit(&self, task_dir: &Path, dispatch_id: &DispatchId, kind: EventKind) {
        let event = CapturedEvent::new(EventId::new(self.id_gen.next()), self.clock.now(), kind);
        if let Err(err) = dispatch_store::append_event(task_dir, dispatch_id, event) {
            tracing::warn!(dispatch_id = %dispatch_id, error = %err, "failed to append draft event");
        }
    }
}

/// Scans the dispatch's event log backward for the most recent session id
/// captured from a `session:init` event, for use as `resume_session_id` on
/// the next turn (spec §4.8: "runs one turn using the agent's session-resume
/// facility").
fn last_agent_session_id(task_dir: &Path, dispatch_id: &DispatchId) -> Result<Option<String>, RuntimeError> {
    let events = dispatch_store::get_dispatch_events(task_dir, dispatch_id)?;
    Ok(events.into_iter().rev().find_map(|event| match event.kind {
        EventKind::SessionInit { session_id } => session_id,
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabot_adapters::FakeAgentAdapter;
    use collabot_core::{FakeClock, RoleCategory, TaskSlug, ToolSetPermission};

    fn role() -> Role {
        Role::new("pairbot", "you pair with the operator", RoleCategory::Conversational)
            .with_permissions(ToolSetPermission::Full)
    }

    fn manager(agent: Arc<FakeAgentAdapter>) -> (DraftManager<FakeAgentAdapter, FakeClock>, Arc<AgentPool>) {
        let clock = FakeClock::new(chrono::Utc::now());
        let pool = Arc::new(AgentPool::new(None));
        let mgr = DraftManager::new(
            agent,
            clock,
            Arc::clone(&pool),
            Arc::new(ProviderRegistry::new()),
            TaskLocks::new(),
            "default-model",
        );
        (mgr, pool)
    }

    fn task(dir: &Path) -> Task {
        let _ = dir;
        Task::new("task-1", "proj", "Pairing session", chrono::Utc::now())
    }

    #[test]
    fn create_draft_rejects_a_second_active_session() {
        let (mgr, _pool) = manager(Arc::new(FakeAgentAdapter::new()));
        let dir = tempfile::tempdir().unwrap();
        mgr.create_draft(&role(), task(dir.path()), dir.path().to_path_buf(), dir.path().to_path_buf(), "chan-1")
            .unwrap();

        let dir2 = tempfile::tempdir().unwrap();
        let err = mgr
            .create_draft(&role(), task(dir2.path()), dir2.path().to_path_buf(), dir2.path().to_path_buf(), "chan-2")
            .unwrap_err();
        assert!(matches!(err, RuntimeError::DraftAlreadyActive));
    }

    #[tokio::test]
    async fn resume_draft_updates_metrics_and_records_in_the_same_dispatch() {
        let adapter = Arc::new(FakeAgentAdapter::new());
        adapter.push_script(vec![
            AgentMessage::System {
                subtype: SystemSubtype::Init,
                session_id: Some("agent-session-1".into()),
                detail: None,
                paths: Vec::new(),
            },
            AgentMessage::Assistant {
                content: vec![ContentBlock::Text { text: "hi there".into() }],
            },
            AgentMessage::Result {
                result: Some(serde_json::json!({"status": "success", "summary": "greeted"})),
                raw_text: "greeted".into(),
                cost_usd: 0.02,
                input_tokens: 500,
                output_tokens: 40,
                cache_tokens: 0,
                context_window: 200_000,
                max_output_tokens: 8192,
                metadata: Default::default(),
            },
        ]);
        let (mgr, _pool) = manager(Arc::clone(&adapter));
        let dir = tempfile::tempdir().unwrap();
        mgr.create_draft(&role(), task(dir.path()), dir.path().to_path_buf(), dir.path().to_path_buf(), "chan-1")
            .unwrap();

        let outcome = mgr
            .resume_draft(&role(), dir.path().to_path_buf(), "hello".into())
            .await
            .unwrap();

        assert_eq!(outcome.session.turn_count, 1);
        assert!((outcome.session.cumulative_cost_usd - 0.02).abs() < f64::EPSILON);
        assert_eq!(outcome.result.unwrap().summary, "greeted");

        let persisted = draft_store::read_draft(dir.path()).unwrap().unwrap();
        assert_eq!(persisted.turn_count, 1);
    }

    #[tokio::test]
    async fn second_turn_resumes_with_the_first_turns_session_id() {
        let adapter = Arc::new(FakeAgentAdapter::new());
        adapter.push_script(vec![AgentMessage::Result {
            result: None,
            raw_text: "ok".into(),
            cost_usd: 0.0,
            input_tokens: 0,
            output_tokens: 0,
            cache_tokens: 0,
            context_window: 0,
            max_output_tokens: 0,
            metadata: Default::default(),
        }]);
        adapter.push_script(vec![
            AgentMessage::System {
                subtype: SystemSubtype::Init,
                session_id: Some("agent-session-1".into()),
                detail: None,
                paths: Vec::new(),
            },
            AgentMessage::Result {
                result: None,
                raw_text: "ok".into(),
                cost_usd: 0.0,
                input_tokens: 0,
                output_tokens: 0,
                cache_tokens: 0,
                context_window: 0,
                max_output_tokens: 0,
                metadata: Default::default(),
            },
        ]);
        let (mgr, _pool) = manager(Arc::clone(&adapter));
        let dir = tempfile::tempdir().unwrap();
        mgr.create_draft(&role(), task(dir.path()), dir.path().to_path_buf(), dir.path().to_path_buf(), "chan-1")
            .unwrap();

        mgr.resume_draft(&role(), dir.path().to_path_buf(), "first".into()).await.unwrap();
        mgr.resume_draft(&role(), dir.path().to_path_buf(), "second".into()).await.unwrap();

        assert_eq!(adapter.calls()[1].resume_session_id.as_deref(), Some("agent-session-1"));
    }

    #[tokio::test]
    async fn close_draft_returns_zero_turns_when_never_resumed() {
        let (mgr, pool) = manager(Arc::new(FakeAgentAdapter::new()));
        let dir = tempfile::tempdir().unwrap();
        mgr.create_draft(&role(), task(dir.path()), dir.path().to_path_buf(), dir.path().to_path_buf(), "chan-1")
            .unwrap();

        let summary = mgr.close_draft().unwrap();
        assert_eq!(summary.turns, 0);
        assert_eq!(pool.size(), 0);
        assert!(mgr.close_draft().is_err());
    }

    #[test]
    fn load_active_draft_recovers_a_draft_left_by_a_prior_process() {
        let (mgr, _pool) = manager(Arc::new(FakeAgentAdapter::new()));
        let projects_dir = tempfile::tempdir().unwrap();
        let project = collabot_core::Project::new("proj");
        collabot_store::project_manifest::write_project(projects_dir.path(), &project).unwrap();
        let task_dir = projects_dir.path().join("proj").join("tasks").join("task-1");
        std::fs::create_dir_all(&task_dir).unwrap();

        let mut t = Task::new("task-1", "proj", "Pairing session", chrono::Utc::now());
        t.upsert_dispatch(DispatchIndexEntry {
            dispatch_id: DispatchId::new("prior-dispatch"),
            role: collabot_core::RoleName::new("pairbot"),
            status: DispatchStatus::Running,
            cost: Some(1.5),
            started_at: chrono::Utc::now(),
            parent_dispatch_id: None,
        });
        collabot_store::task_manifest::write_task(&task_dir, &t).unwrap();

        let mut session = DraftSession::new(
            collabot_core::DraftSessionId::new("s1"),
            collabot_core::RoleName::new("pairbot"),
            TaskSlug::new("task-1"),
            "chan-1",
            chrono::Utc::now(),
        );
        session.record_turn(chrono::Utc::now(), 1.5, 100, 50, 200_000, 8192);
        draft_store::write_draft(&task_dir, &session).unwrap();

        let recovered = mgr.load_active_draft(projects_dir.path()).unwrap().unwrap();
        assert_eq!(recovered.turn_count, 1);
        assert!((recovered.cumulative_cost_usd - 1.5).abs() < f64::EPSILON);

        let err = mgr.create_draft(&role(), task(task_dir.as_path()), task_dir.clone(), task_dir.clone(), "chan-2").unwrap_err();
        assert!(matches!(err, RuntimeError::DraftAlreadyActive));
    }

    #[test]
    fn load_active_draft_is_none_when_nothing_is_active() {
        let (mgr, _pool) = manager(Arc::new(FakeAgentAdapter::new()));
        let projects_dir = tempfile::tempdir().unwrap();
        assert!(mgr.load_active_draft(projects_dir.path()).unwrap().is_none());
    }
}
