// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-dispatch durable event log (spec §4.2). Each dispatch gets its own
//! file (`<taskDir>/dispatches/<dispatchId>.json`); the dispatch-scoped-log
//! design explicitly rejects a single flat file per task (spec §9
//! "Dispatch-scoped event log vs. prior flat log") to eliminate write
//! contention between parallel dispatches.
//!
//! Each dispatch has exactly one writer (the dispatch runtime loop driving
//! it), so no lock is needed on the dispatch file itself — only the task
//! manifest, touched by every dispatch on the task, needs one (see
//! `task_manifest`).

use crate::error::StoreError;
use collabot_core::{CapturedEvent, DispatchEnvelope, DispatchFile, DispatchId, TaskSlug};
use std::path::{Path, PathBuf};

fn dispatches_dir(task_dir: &Path) -> PathBuf {
    task_dir.join("dispatches")
}

fn dispatch_path(task_dir: &Path, id: &DispatchId) -> PathBuf {
    dispatches_dir(task_dir).join(format!("{}.json", id.as_str()))
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn read_dispatch_file(path: &Path) -> Result<Option<DispatchFile>, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.display().to_string(),
                source,
            }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

fn write_dispatch_file(path: &Path, file: &DispatchFile) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let json = serde_json::to_string_pretty(file).map_err(|source| StoreError::Corrupt {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, json).map_err(|e| io_err(path, e))
}

/// Create a new dispatch file for a freshly started envelope. The caller
/// (`collabot-engine`'s dispatch runtime) is responsible for also updating
/// the task manifest index under the per-task lock (spec §4.2 invariant: the
/// index entry is written before the first `append_event`).
pub fn create_dispatch(task_dir: &Path, envelope: DispatchEnvelope) -> Result<(), StoreError> {
    let path = dispatch_path(task_dir, &envelope.id);
    write_dispatch_file(&path, &DispatchFile::new(envelope))
}

/// A partial update applied to an envelope in place. Fields left `None` are
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct DispatchPatch {
    pub status: Option<collabot_core::DispatchStatus>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub abort_reason: Option<collabot_core::AbortReason>,
    pub cost: Option<f64>,
    pub usage: Option<collabot_core::UsageRecord>,
    pub result: Option<collabot_core::StructuredResult>,
    pub raw_result_text: Option<String>,
}

fn apply_patch(envelope: &mut DispatchEnvelope, patch: DispatchPatch) {
    if let Some(status) = patch.status {
        envelope.status = status;
    }
    if patch.completed_at.is_some() {
        envelope.completed_at = patch.completed_at;
    }
    if patch.abort_reason.is_some() {
        envelope.abort_reason = patch.abort_reason;
    }
    if patch.cost.is_some() {
        envelope.cost = patch.cost;
    }
    if patch.usage.is_some() {
        envelope.usage = patch.usage;
    }
    if patch.result.is_some() {
        envelope.result = patch.result;
    }
    if patch.raw_result_text.is_some() {
        envelope.raw_result_text = patch.raw_result_text;
    }
}

/// Read-modify-write the envelope portion of a dispatch file (spec §4.2).
pub fn update_dispatch(
    task_dir: &Path,
    id: &DispatchId,
    patch: DispatchPatch,
) -> Result<DispatchEnvelope, StoreError> {
    let path = dispatch_path(task_dir, id);
    let mut file =
        read_dispatch_file(&path)?.ok_or_else(|| StoreError::DispatchNotFound(id.to_string()))?;
    apply_patch(&mut file.envelope, patch);
    write_dispatch_file(&path, &file)?;
    Ok(file.envelope)
}

/// Append one event to a dispatch's event sequence. Monotonic in timestamp
/// within the single writer that owns this dispatch (spec §4.2, §5).
pub fn append_event(
    task_dir: &Path,
    id: &DispatchId,
    event: CapturedEvent,
) -> Result<(), StoreError> {
    let path = dispatch_path(task_dir, id);
    let mut file =
        read_dispatch_file(&path)?.ok_or_else(|| StoreError::DispatchNotFound(id.to_string()))?;
    file.events.push(event);
    write_dispatch_file(&path, &file)
}

/// All envelopes for a task. Missing/corrupt dispatch files are skipped
/// rather than failing the whole read (spec §4.2 invariant).
pub fn get_dispatch_envelopes(task_dir: &Path) -> Result<Vec<DispatchEnvelope>, StoreError> {
    let dir = dispatches_dir(task_dir);
    let mut envelopes = Vec::new();
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(envelopes),
        Err(err) => return Err(io_err(&dir, err)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| io_err(&dir, e))?;
        if let Ok(Some(file)) = read_dispatch_file(&entry.path()) {
            envelopes.push(file.envelope);
        }
    }
    envelopes.sort_by(|a, b| a.started_at.cmp(&b.started_at));
    Ok(envelopes)
}

pub fn get_dispatch_envelope(
    task_dir: &Path,
    id: &DispatchId,
) -> Result<Option<DispatchEnvelope>, StoreError> {
    let path = dispatch_path(task_dir, id);
    Ok(read_dispatch_file(&path)?.map(|f| f.envelope))
}

/// Full event sequence for a dispatch. Returns an empty sequence rather than
/// an error when the file is missing or corrupt (spec §4.2 invariant).
pub fn get_dispatch_events(
    task_dir: &Path,
    id: &DispatchId,
) -> Result<Vec<CapturedEvent>, StoreError> {
    let path = dispatch_path(task_dir, id);
    Ok(read_dispatch_file(&path)
        .unwrap_or(None)
        .map(|f| f.events)
        .unwrap_or_default())
}

/// The last `n` events for a dispatch, by arrival order.
pub fn get_recent_events(
    task_dir: &Path,
    id: &DispatchId,
    n: usize,
) -> Result<Vec<CapturedEvent>, StoreError> {
    let mut events = get_dispatch_events(task_dir, id)?;
    if events.len() > n {
        events = events.split_off(events.len() - n);
    }
    Ok(events)
}

/// Path to a task's directory under a project's root, matching the layout
/// `<projectsDir>/<project>/tasks/<slug>` the manifest/dispatch-file APIs
/// assume.
pub fn task_dir(projects_dir: &Path, project: &collabot_core::ProjectName, slug: &TaskSlug) -> PathBuf {
    projects_dir
        .join(project.as_str())
        .join("tasks")
        .join(slug.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabot_core::{
        DispatchEnvelope, DispatchId, DispatchStatus, EventId, EventKind, ProjectName, RoleName,
    };

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

    #[test]
    fn create_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let env = envelope("d1");
        create_dispatch(dir.path(), env.clone()).unwrap();
        let read = get_dispatch_envelope(dir.path(), &env.id).unwrap().unwrap();
        assert_eq!(read.id, env.id);
        assert!(read.is_running());
    }

    #[test]
    fn append_event_then_read_returns_appended_event_last() {
        let dir = tempfile::tempdir().unwrap();
        let env = envelope("d1");
        create_dispatch(dir.path(), env.clone()).unwrap();
        append_event(
            dir.path(),
            &env.id,
            CapturedEvent::new(EventId::new("e1"), chrono::Utc::now(), EventKind::SessionInit { session_id: None }),
        )
        .unwrap();
        append_event(
            dir.path(),
            &env.id,
            CapturedEvent::new(EventId::new("e2"), chrono::Utc::now(), EventKind::SessionCompaction),
        )
        .unwrap();
        let events = get_dispatch_events(dir.path(), &env.id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events.last().unwrap().id, EventId::new("e2"));
    }

    #[test]
    fn update_dispatch_applies_patch_fields() {
        let dir = tempfile::tempdir().unwrap();
        let env = envelope("d1");
        create_dispatch(dir.path(), env.clone()).unwrap();
        let now = chrono::Utc::now();
        let patch = DispatchPatch {
            status: Some(DispatchStatus::Completed),
            completed_at: Some(now),
            cost: Some(1.23),
            ..Default::default()
        };
        let updated = update_dispatch(dir.path(), &env.id, patch).unwrap();
        assert_eq!(updated.status, DispatchStatus::Completed);
        assert_eq!(updated.completed_at, Some(now));
        assert_eq!(updated.cost, Some(1.23));
    }

    #[test]
    fn missing_dispatch_file_returns_empty_event_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let events = get_dispatch_events(dir.path(), &DispatchId::new("missing")).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn missing_dispatches_dir_returns_empty_envelope_list() {
        let dir = tempfile::tempdir().unwrap();
        let envelopes = get_dispatch_envelopes(dir.path()).unwrap();
        assert!(envelopes.is_empty());
    }

    #[test]
    fn recent_events_returns_tail_in_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let env = envelope("d1");
        create_dispatch(dir.path(), env.clone()).unwrap();
        for i in 0..5 {
            append_event(
                dir.path(),
                &env.id,
                CapturedEvent::new(
                    EventId::new(format!("e{i}")),
                    chrono::Utc::now(),
                    EventKind::SessionCompaction,
                ),
            )
            .unwrap();
        }
        let recent = get_recent_events(dir.path(), &env.id, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, EventId::new("e3"));
        assert_eq!(recent[1].id, EventId::new("e4"));
    }

    #[test]
    fn task_dir_joins_projects_root_with_project_and_slug() {
        let root = PathBuf::from("/projects");
        let dir = task_dir(&root, &ProjectName::new("demo"), &TaskSlug::new("slug-1"));
        assert_eq!(dir, PathBuf::from("/projects/demo/tasks/slug-1"));
    }
}
