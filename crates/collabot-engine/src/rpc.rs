// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC tool surface exposed to running agents (spec §4.7): six tools split
//! across two capability sets, materialized as two distinct structs rather
//! than one server that filters per call (spec §9 "Capability gating of RPC
//! tools"). `ReadTools` holds the three read-only tools every role gets;
//! `FullTools` wraps a `ReadTools` and adds the three drafting tools for
//! roles with the agent-drafting permission.

use crate::cancel::CancellationHandle;
use crate::context::build_task_context;
use crate::dispatch::{DispatchInput, DispatchRuntime};
use crate::error::RuntimeError;
use crate::pool::AgentPool;
use crate::tracker::{DispatchResult, DispatchTracker};
use collabot_adapters::AgentAdapter;
use collabot_core::{ActiveAgent, Clock, DispatchId, ProjectName, Task, TaskSlug};
use collabot_store::{dispatch_store, project_manifest, task_manifest};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolSurfaceError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Store(#[from] collabot_store::StoreError),
}

/// The read set (spec §4.7 "all roles"): pool introspection, task listing,
/// and context reconstruction. Requires no agent-drafting permission.
pub struct ReadTools {
    pool: Arc<AgentPool>,
    projects_dir: PathBuf,
}

impl ReadTools {
    pub fn new(pool: Arc<AgentPool>, projects_dir: PathBuf) -> Self {
        Self { pool, projects_dir }
    }

    /// `list_agents()` — projects the pool to safe JSON (spec §4.7).
    pub fn list_agents(&self) -> Vec<ActiveAgent> {
        self.pool.list()
    }

    /// `list_tasks()` — reads task directories under the resolved project.
    pub fn list_tasks(&self, project: &ProjectName) -> Result<Vec<Task>, ToolSurfaceError> {
        let mut tasks = Vec::new();
        for dir in project_manifest::list_task_dirs(&self.projects_dir, project)? {
            if let Some(task) = task_manifest::read_task(&dir)? {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    /// `get_task_context(slug)` — returns the output of spec §4.5.
    pub fn get_task_context(
        &self,
        project: &ProjectName,
        slug: &TaskSlug,
    ) -> Result<String, ToolSurfaceError> {
        let task_dir = dispatch_store::task_dir(&self.projects_dir, project, slug);
        let task = task_manifest::read_task(&task_dir)?
            .ok_or_else(|| RuntimeError::TaskNotFound(slug.to_string()))?;
        let envelopes = dispatch_store::get_dispatch_envelopes(&task_dir)?;
        Ok(build_task_context(&task, &envelopes))
    }
}

/// The full set (spec §4.7 "roles with the agent-drafting permission"):
/// everything in `ReadTools` plus `draft_agent`/`await_agent`/`kill_agent`.
pub struct FullTools<A, C>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    read: ReadTools,
    runtime: DispatchRuntime<A, C>,
    tracker: Arc<DispatchTracker>,
}

impl<A, C> FullTools<A, C>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    pub fn new(
        runtime: DispatchRuntime<A, C>,
        pool: Arc<AgentPool>,
        tracker: Arc<DispatchTracker>,
        projects_dir: PathBuf,
    ) -> Self {
        Self {
            read: ReadTools::new(pool, projects_dir),
            runtime,
            tracker,
        }
    }

    pub fn list_agents(&self) -> Vec<ActiveAgent> {
        self.read.list_agents()
    }

    pub fn list_tasks(&self, project: &ProjectName) -> Result<Vec<Task>, ToolSurfaceError> {
        self.read.list_tasks(project)
    }

    pub fn get_task_context(
        &self,
        project: &ProjectName,
        slug: &TaskSlug,
    ) -> Result<String, ToolSurfaceError> {
        self.read.get_task_context(project, slug)
    }

    /// `draft_agent(role, prompt, taskSlug?)` — allocates a dispatch id,
    /// begins a new dispatch asynchronously, returns the id immediately, and
    /// tracks the completion promise. The caller is responsible for setting
    /// `input.parent_dispatch_id` to its own dispatch id before calling this
    /// (spec §4.7: "The new dispatch carries `parentDispatchId` set to the
    /// calling dispatch's id").
    pub fn draft_agent(&self, input: DispatchInput) -> Result<DispatchId, ToolSurfaceError> {
        let cancel = CancellationHandle::new();
        let dispatch_id = self.runtime.begin_dispatch(&input, cancel.clone())?;

        let runtime = self.runtime.clone();
        let spawned_id = dispatch_id.clone();
        tokio::spawn(async move {
            runtime.run_dispatch(spawned_id, input, cancel).await;
        });

        Ok(dispatch_id)
    }

    /// `await_agent(id)` — blocks on the tracker's promise for that id;
    /// returns the dispatch's structured result or an error.
    pub async fn await_agent(&self, id: &DispatchId) -> Result<DispatchResult, ToolSurfaceError> {
        Ok(self.tracker.await_result(id).await?)
    }

    /// `kill_agent(id)` — calls `pool.kill(id)`.
    pub fn kill_agent(&self, id: &DispatchId) -> bool {
        self.read.pool.kill(id)
    }
}
