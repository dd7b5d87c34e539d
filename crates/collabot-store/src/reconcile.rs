// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation pass: recompute a task's dispatch index from its dispatch
//! files on disk and report discrepancies against the persisted manifest
//! (spec §9 "Manifest/envelope duality" — the index is a derived cache of
//! envelopes; any discrepancy is a bug). Grounded on the teacher's
//! `daemon/lifecycle/reconcile.rs` startup-reconciliation pass.

use crate::dispatch_store::get_dispatch_envelopes;
use crate::error::StoreError;
use crate::task_manifest::{read_task, write_task};
use collabot_core::{DispatchId, DispatchIndexEntry, Task};
use std::path::Path;

/// One discrepancy between the persisted index and the recomputed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    MissingFromIndex(DispatchId),
    StaleInIndex(DispatchId),
    StatusMismatch {
        id: DispatchId,
        indexed: collabot_core::DispatchStatus,
        actual: collabot_core::DispatchStatus,
    },
}

fn recompute_index(task: &mut Task, task_dir: &Path) -> Result<(), StoreError> {
    let envelopes = get_dispatch_envelopes(task_dir)?;
    task.dispatches = envelopes
        .iter()
        .map(|env| DispatchIndexEntry {
            dispatch_id: env.id.clone(),
            role: env.role.clone(),
            status: env.status,
            cost: env.cost,
            started_at: env.started_at,
            parent_dispatch_id: env.parent_dispatch_id.clone(),
        })
        .collect();
    Ok(())
}

/// Diff the persisted manifest's index against the dispatch files on disk,
/// without mutating anything.
pub fn diff(task_dir: &Path) -> Result<Vec<Discrepancy>, StoreError> {
    let persisted = read_task(task_dir)?;
    let envelopes = get_dispatch_envelopes(task_dir)?;
    let mut discrepancies = Vec::new();

    let persisted_entries: std::collections::HashMap<_, _> = persisted
        .as_ref()
        .map(|t| {
            t.dispatches
                .iter()
                .map(|e| (e.dispatch_id.clone(), e.status))
                .collect()
        })
        .unwrap_or_default();

    let actual_ids: std::collections::HashSet<_> =
        envelopes.iter().map(|e| e.id.clone()).collect();

    for envelope in &envelopes {
        match persisted_entries.get(&envelope.id) {
            None => discrepancies.push(Discrepancy::MissingFromIndex(envelope.id.clone())),
            Some(indexed) if *indexed != envelope.status => {
                discrepancies.push(Discrepancy::StatusMismatch {
                    id: envelope.id.clone(),
                    indexed: *indexed,
                    actual: envelope.status,
                })
            }
            Some(_) => {}
        }
    }
    for id in persisted_entries.keys() {
        if !actual_ids.contains(id) {
            discrepancies.push(Discrepancy::StaleInIndex(id.clone()));
        }
    }
    Ok(discrepancies)
}

/// Recompute and persist the task's dispatch index from its dispatch files,
/// returning the discrepancies found against the previously persisted index.
pub fn reconcile(task_dir: &Path, default_task: impl FnOnce() -> Task) -> Result<Vec<Discrepancy>, StoreError> {
    let discrepancies = diff(task_dir)?;
    let mut task = read_task(task_dir)?.unwrap_or_else(default_task);
    recompute_index(&mut task, task_dir)?;
    write_task(task_dir, &task)?;
    Ok(discrepancies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch_store::create_dispatch;
    use collabot_core::{DispatchEnvelope, RoleName, TaskSlug};
    use std::path::PathBuf;

    fn envelope(id: &str) -> DispatchEnvelope {
        DispatchEnvelope::start(
            DispatchId::new(id),
            TaskSlug::new("task-1"),
            RoleName::new("worker"),
            "claude-x",
            PathBuf::from("/tmp/work"),
            chrono::Utc::now(),
            None,
        )
    }

    fn default_task() -> Task {
        Task::new("task-1", "proj-1", "Task One", chrono::Utc::now())
    }

    #[test]
    fn reconcile_with_no_prior_manifest_reports_every_dispatch_missing() {
        let dir = tempfile::tempdir().unwrap();
        create_dispatch(dir.path(), envelope("d1")).unwrap();
        let discrepancies = reconcile(dir.path(), default_task).unwrap();
        assert_eq!(
            discrepancies,
            vec![Discrepancy::MissingFromIndex(DispatchId::new("d1"))]
        );
        let task = read_task(dir.path()).unwrap().unwrap();
        assert_eq!(task.dispatches.len(), 1);
    }

    #[test]
    fn reconcile_is_clean_once_index_matches_dispatch_files() {
        let dir = tempfile::tempdir().unwrap();
        create_dispatch(dir.path(), envelope("d1")).unwrap();
        reconcile(dir.path(), default_task).unwrap();
        let discrepancies = reconcile(dir.path(), default_task).unwrap();
        assert!(discrepancies.is_empty());
    }
}
