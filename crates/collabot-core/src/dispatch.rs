// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch envelope: the metadata record for one invocation of the agent
//! (spec §3).

use crate::ids::{DispatchId, RoleName, TaskSlug};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Running,
    Completed,
    Aborted,
    Crashed,
}

impl DispatchStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DispatchStatus::Running)
    }
}

/// Why a dispatch was aborted (spec §4.1 step 4-6, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    ErrorLoop,
    PingPong,
    NonRetryableError,
    Stall,
    External,
}

/// Token/cost accounting reported by the agent at dispatch end (spec §3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_tokens: u64,
    pub context_window: u64,
    pub max_output: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Partial,
    Failed,
    Blocked,
}

/// Structured agent result schema (spec §6), validated by the runtime after
/// the agent's stream ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResult {
    pub status: ResultStatus,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEnvelope {
    pub id: DispatchId,
    pub task_slug: TaskSlug,
    pub role: RoleName,
    pub model: String,
    pub working_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: DispatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<AbortReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StructuredResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_result_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_dispatch_id: Option<DispatchId>,
    /// Reserved for a future multi-bot deployment; unused by this core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
}

impl DispatchEnvelope {
    pub fn start(
        id: DispatchId,
        task_slug: TaskSlug,
        role: RoleName,
        model: impl Into<String>,
        working_dir: PathBuf,
        started_at: DateTime<Utc>,
        parent_dispatch_id: Option<DispatchId>,
    ) -> Self {
        Self {
            id,
            task_slug,
            role,
            model: model.into(),
            working_dir,
            started_at,
            completed_at: None,
            status: DispatchStatus::Running,
            abort_reason: None,
            cost: None,
            usage: None,
            result: None,
            raw_result_text: None,
            parent_dispatch_id,
            bot_id: None,
        }
    }

    /// Finalize the envelope with a terminal status. `completed_at` and
    /// `status` arrive atomically (spec §3 invariant) — there is no setter
    /// for either field alone.
    pub fn finalize(
        &mut self,
        status: DispatchStatus,
        completed_at: DateTime<Utc>,
        abort_reason: Option<AbortReason>,
    ) {
        debug_assert!(status.is_terminal(), "finalize requires a terminal status");
        self.status = status;
        self.completed_at = Some(completed_at);
        self.abort_reason = abort_reason;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, DispatchStatus::Running) && self.completed_at.is_none()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct DispatchEnvelopeBuilder {
    envelope: DispatchEnvelope,
}

#[cfg(any(test, feature = "test-support"))]
impl DispatchEnvelopeBuilder {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            envelope: DispatchEnvelope::start(
                DispatchId::new("dispatch-1"),
                TaskSlug::new("task"),
                RoleName::new("worker"),
                "default-model",
                PathBuf::from("/tmp/task"),
                started_at,
                None,
            ),
        }
    }

    pub fn id(mut self, id: impl Into<DispatchId>) -> Self {
        self.envelope.id = id.into();
        self
    }

    pub fn task_slug(mut self, slug: impl Into<TaskSlug>) -> Self {
        self.envelope.task_slug = slug.into();
        self
    }

    pub fn parent(mut self, id: impl Into<DispatchId>) -> Self {
        self.envelope.parent_dispatch_id = Some(id.into());
        self
    }

    pub fn build(self) -> DispatchEnvelope {
        self.envelope
    }
}
