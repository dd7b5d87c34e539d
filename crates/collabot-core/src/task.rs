// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task: a unit of work scoped to exactly one project (spec §3).

use crate::ids::{DispatchId, ProjectName, RoleName, TaskSlug};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Closed,
}

/// Lightweight per-dispatch entry in the task's dispatch index, derived from
/// the dispatch file (spec §3 "Dispatch file").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchIndexEntry {
    pub dispatch_id: DispatchId,
    pub role: RoleName,
    pub status: crate::dispatch::DispatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_dispatch_id: Option<DispatchId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub slug: TaskSlug,
    pub project: ProjectName,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub dispatches: Vec<DispatchIndexEntry>,
}

impl Task {
    pub fn new(
        slug: impl Into<TaskSlug>,
        project: impl Into<ProjectName>,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            slug: slug.into(),
            project: project.into(),
            name: name.into(),
            description: None,
            status: TaskStatus::Open,
            created_at,
            dispatches: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, TaskStatus::Open)
    }

    /// Insert or update the index entry for one dispatch, keyed by id.
    /// Status never regresses: a terminal entry already in the index is not
    /// overwritten by a `running` update arriving late (spec §4.2 invariant).
    pub fn upsert_dispatch(&mut self, entry: DispatchIndexEntry) {
        if let Some(existing) = self
            .dispatches
            .iter_mut()
            .find(|e| e.dispatch_id == entry.dispatch_id)
        {
            if existing.status.is_terminal() && !entry.status.is_terminal() {
                return;
            }
            *existing = entry;
        } else {
            self.dispatches.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchStatus;

    fn entry(id: &str, status: DispatchStatus) -> DispatchIndexEntry {
        DispatchIndexEntry {
            dispatch_id: DispatchId::new(id),
            role: RoleName::new("worker"),
            status,
            cost: None,
            started_at: Utc::now(),
            parent_dispatch_id: None,
        }
    }

    #[test]
    fn upsert_inserts_new_entries() {
        let mut task = Task::new("slug", "proj", "Task", Utc::now());
        task.upsert_dispatch(entry("d1", DispatchStatus::Running));
        assert_eq!(task.dispatches.len(), 1);
    }

    #[test]
    fn upsert_never_regresses_terminal_status() {
        let mut task = Task::new("slug", "proj", "Task", Utc::now());
        task.upsert_dispatch(entry("d1", DispatchStatus::Completed));
        task.upsert_dispatch(entry("d1", DispatchStatus::Running));
        assert_eq!(task.dispatches[0].status, DispatchStatus::Completed);
    }
}
