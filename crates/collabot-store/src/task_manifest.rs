// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task manifest (`<taskDir>/task.json`, spec §6) and the per-task lock that
//! serializes concurrent index updates (spec §4.2, §5, §9 "Manifest/envelope
//! duality"), grounded on the teacher's `Mutex<MaterializedState>`
//! single-writer convention (`oj-storage/src/state.rs`), narrowed here to one
//! mutex per task slug rather than one global state mutex.

use crate::error::StoreError;
use collabot_core::{DispatchIndexEntry, Task};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn manifest_path(task_dir: &Path) -> PathBuf {
    task_dir.join("task.json")
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

pub fn read_task(task_dir: &Path) -> Result<Option<Task>, StoreError> {
    let path = manifest_path(task_dir);
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

pub fn write_task(task_dir: &Path, task: &Task) -> Result<(), StoreError> {
    let path = manifest_path(task_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let json = serde_json::to_string_pretty(task).map_err(|source| StoreError::Corrupt {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(&path, json).map_err(|e| io_err(&path, e))
}

/// Process-wide registry of per-task locks, keyed by task directory. Holding
/// the returned guard for the duration of a manifest read-modify-write
/// serializes concurrent dispatches appending index entries to the same task
/// (spec §5 "a per-task lock so that the index never loses an entry").
#[derive(Clone, Default)]
pub struct TaskLocks {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl TaskLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, task_dir: &Path) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(task_dir.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` with the manifest loaded (creating it via `default_task` if
    /// absent), persist whatever `f` returns, and hold the per-task lock for
    /// the whole read-modify-write.
    pub fn with_manifest<F>(
        &self,
        task_dir: &Path,
        default_task: impl FnOnce() -> Task,
        f: F,
    ) -> Result<Task, StoreError>
    where
        F: FnOnce(&mut Task),
    {
        let lock = self.lock_for(task_dir);
        let _guard = lock.lock();
        let mut task = read_task(task_dir)?.unwrap_or_else(default_task);
        f(&mut task);
        write_task(task_dir, &task)?;
        Ok(task)
    }

    /// Upsert one dispatch index entry under the per-task lock (spec §4.2
    /// `createDispatch`/`updateDispatch` manifest refresh).
    pub fn upsert_dispatch_entry(
        &self,
        task_dir: &Path,
        default_task: impl FnOnce() -> Task,
        entry: DispatchIndexEntry,
    ) -> Result<Task, StoreError> {
        self.with_manifest(task_dir, default_task, |task| task.upsert_dispatch(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabot_core::{DispatchId, DispatchStatus, RoleName, TaskSlug};
    use std::sync::Barrier;

    fn entry(id: &str) -> DispatchIndexEntry {
        DispatchIndexEntry {
            dispatch_id: DispatchId::new(id),
            role: RoleName::new("worker"),
            status: DispatchStatus::Running,
            cost: None,
            started_at: chrono::Utc::now(),
            parent_dispatch_id: None,
        }
    }

    fn default_task() -> Task {
        Task::new("slug-1", "proj-1", "Task One", chrono::Utc::now())
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        write_task(dir.path(), &default_task()).unwrap();
        let read = read_task(dir.path()).unwrap().unwrap();
        assert_eq!(read.slug, TaskSlug::new("slug-1"));
    }

    #[test]
    fn missing_manifest_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_task(dir.path()).unwrap().is_none());
    }

    #[test]
    fn upsert_dispatch_entry_creates_manifest_if_absent() {
        let dir = tempfile::tempdir().unwrap();
        let locks = TaskLocks::new();
        let task = locks
            .upsert_dispatch_entry(dir.path(), default_task, entry("d1"))
            .unwrap();
        assert_eq!(task.dispatches.len(), 1);
    }

    #[test]
    fn concurrent_upserts_on_same_task_never_lose_an_entry() {
        let dir = tempfile::tempdir().unwrap();
        let locks = TaskLocks::new();
        let n = 8;
        let barrier = Arc::new(Barrier::new(n));
        std::thread::scope(|scope| {
            for i in 0..n {
                let locks = locks.clone();
                let dir = dir.path().to_path_buf();
                let barrier = barrier.clone();
                scope.spawn(move || {
                    barrier.wait();
                    locks
                        .upsert_dispatch_entry(&dir, default_task, entry(&format!("d{i}")))
                        .unwrap();
                });
            }
        });
        let task = read_task(dir.path()).unwrap().unwrap();
        assert_eq!(task.dispatches.len(), n);
    }
}
