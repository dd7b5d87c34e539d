// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Draft persistence (`<taskDir>/draft.json`, spec §6).

use crate::error::StoreError;
use collabot_core::{DraftSession, DraftStatus};
use std::path::{Path, PathBuf};

fn draft_path(task_dir: &Path) -> PathBuf {
    task_dir.join("draft.json")
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

pub fn read_draft(task_dir: &Path) -> Result<Option<DraftSession>, StoreError> {
    let path = draft_path(task_dir);
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.display().to_string(),
                source,
            }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(&path, err)),
    }
}

pub fn write_draft(task_dir: &Path, session: &DraftSession) -> Result<(), StoreError> {
    let path = draft_path(task_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let json = serde_json::to_string_pretty(session).map_err(|source| StoreError::Corrupt {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(&path, json).map_err(|e| io_err(&path, e))
}

/// Scan every task directory under every project for a `draft.json` with
/// status `active` (spec §4.8 `loadActiveDraft`). More than one is a hard
/// error — the single-active-draft invariant (spec §3) must never be
/// violated on disk.
pub fn scan_active_draft(projects_dir: &Path) -> Result<Option<(PathBuf, DraftSession)>, StoreError> {
    let mut found: Option<(PathBuf, DraftSession)> = None;
    for project in crate::project_manifest::list_projects(projects_dir)? {
        for task_dir in crate::project_manifest::list_task_dirs(projects_dir, &project.name)? {
            if let Some(session) = read_draft(&task_dir)? {
                if session.status == DraftStatus::Active {
                    if found.is_some() {
                        return Err(StoreError::MultipleActiveDrafts);
                    }
                    found = Some((task_dir, session));
                }
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabot_core::{DraftSessionId, RoleName, TaskSlug};

    fn session() -> DraftSession {
        DraftSession::new(
            DraftSessionId::new("s1"),
            RoleName::new("pairbot"),
            TaskSlug::new("task-1"),
            "chan-1",
            chrono::Utc::now(),
        )
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        write_draft(dir.path(), &session()).unwrap();
        let read = read_draft(dir.path()).unwrap().unwrap();
        assert!(read.is_active());
    }

    #[test]
    fn scan_finds_exactly_one_active_draft() {
        let dir = tempfile::tempdir().unwrap();
        let project = collabot_core::Project::new("demo");
        crate::project_manifest::write_project(dir.path(), &project).unwrap();
        let task_dir = dir.path().join("demo").join("tasks").join("task-1");
        std::fs::create_dir_all(&task_dir).unwrap();
        write_draft(&task_dir, &session()).unwrap();

        let found = scan_active_draft(dir.path()).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn scan_rejects_two_active_drafts() {
        let dir = tempfile::tempdir().unwrap();
        let project = collabot_core::Project::new("demo");
        crate::project_manifest::write_project(dir.path(), &project).unwrap();
        for slug in ["task-1", "task-2"] {
            let task_dir = dir.path().join("demo").join("tasks").join(slug);
            std::fs::create_dir_all(&task_dir).unwrap();
            write_draft(&task_dir, &session()).unwrap();
        }
        let err = scan_active_draft(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::MultipleActiveDrafts));
    }
}
