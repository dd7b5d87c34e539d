// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent pool: a bounded in-memory registry of live dispatches with
//! cancellation handles (spec §4.4), grounded on the teacher's
//! `Mutex<HashMap<AgentId, OwnerId>>` registry style
//! (`oj-engine/src/runtime/mod.rs`).

use crate::cancel::CancellationHandle;
use crate::error::RuntimeError;
use collabot_core::{ActiveAgent, DispatchId, RoleName, TaskSlug};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

struct PoolEntry {
    active: ActiveAgent,
    cancel: CancellationHandle,
}

type OnChange = Arc<dyn Fn(Vec<ActiveAgent>) + Send + Sync>;

/// Live-dispatch registry (spec §4.4 "Agent pool"). `release` must be called
/// exactly once per successful `register` on every code path (spec §4.4
/// invariant) — the dispatch runtime's scope guard is responsible for this,
/// not the pool itself.
pub struct AgentPool {
    entries: Mutex<HashMap<DispatchId, PoolEntry>>,
    max_concurrent: Option<usize>,
    on_change: Mutex<Option<OnChange>>,
}

impl AgentPool {
    pub fn new(max_concurrent: Option<usize>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_concurrent,
            on_change: Mutex::new(None),
        }
    }

    pub fn on_change(&self, cb: impl Fn(Vec<ActiveAgent>) + Send + Sync + 'static) {
        *self.on_change.lock() = Some(Arc::new(cb));
    }

    fn notify_change(&self, entries: &HashMap<DispatchId, PoolEntry>) {
        if let Some(cb) = self.on_change.lock().clone() {
            let snapshot = entries.values().map(|e| e.active.clone()).collect();
            cb(snapshot);
        }
    }

    pub fn register(
        &self,
        dispatch_id: DispatchId,
        role: RoleName,
        task_slug: TaskSlug,
        started_at: DateTime<Utc>,
        cancel: CancellationHandle,
    ) -> Result<(), RuntimeError> {
        let mut entries = self.entries.lock();
        if let Some(max) = self.max_concurrent {
            if max > 0 && entries.len() >= max {
                return Err(RuntimeError::PoolAtCapacity);
            }
        }
        entries.insert(
            dispatch_id.clone(),
            PoolEntry {
                active: ActiveAgent::new(dispatch_id, role, task_slug, started_at),
                cancel,
            },
        );
        self.notify_change(&entries);
        Ok(())
    }

    pub fn release(&self, id: &DispatchId) {
        let mut entries = self.entries.lock();
        entries.remove(id);
        self.notify_change(&entries);
    }

    /// No-op if `id` is absent (spec §4.4).
    pub fn kill(&self, id: &DispatchId) -> bool {
        let entries = self.entries.lock();
        match entries.get(id) {
            Some(entry) => {
                entry.cancel.cancel(collabot_core::AbortReason::External);
                true
            }
            None => false,
        }
    }

    pub fn list(&self) -> Vec<ActiveAgent> {
        self.entries.lock().values().map(|e| e.active.clone()).collect()
    }

    pub fn size(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn has(&self, id: &DispatchId) -> bool {
        self.entries.lock().contains_key(id)
    }
}
