// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch tracker: a map from dispatch id to a completion promise, used by
//! the RPC tool surface's `await_agent` (spec §4.4, §4.7).

use crate::error::RuntimeError;
use collabot_core::{DispatchId, DispatchStatus, RoleName, StructuredResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

/// Final outcome of one dispatch (spec §4.1 contract's "Output").
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub dispatch_id: DispatchId,
    pub status: DispatchStatus,
    pub result: Option<StructuredResult>,
    pub raw_text: Option<String>,
    pub cost: Option<f64>,
    pub duration_ms: i64,
    pub error: Option<String>,
}

struct Entry {
    #[allow(dead_code)]
    role: RoleName,
    settled: Mutex<Option<DispatchResult>>,
    notify: Arc<Notify>,
}

/// Completion-promise registry (spec §4.4 "Dispatch tracker").
#[derive(Default)]
pub struct DispatchTracker {
    entries: Mutex<HashMap<DispatchId, Arc<Entry>>>,
}

impl DispatchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, id: DispatchId, role: RoleName) {
        self.entries.lock().insert(
            id,
            Arc::new(Entry {
                role,
                settled: Mutex::new(None),
                notify: Arc::new(Notify::new()),
            }),
        );
    }

    pub fn complete(&self, id: &DispatchId, result: DispatchResult) {
        if let Some(entry) = self.entries.lock().get(id) {
            *entry.settled.lock() = Some(result);
            entry.notify.notify_waiters();
        }
    }

    pub fn has(&self, id: &DispatchId) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Blocks until the dispatch's promise settles; errors if `id` was never
    /// tracked (spec §4.4 "returns the result or an error if unknown id").
    pub async fn await_result(&self, id: &DispatchId) -> Result<DispatchResult, RuntimeError> {
        let entry = self
            .entries
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::DispatchNotFound(id.to_string()))?;

        loop {
            if let Some(result) = entry.settled.lock().clone() {
                return Ok(result);
            }
            let notified = entry.notify.notified();
            if let Some(result) = entry.settled.lock().clone() {
                return Ok(result);
            }
            notified.await;
        }
    }

    /// Drops entries whose promise has already settled (spec §4.4 "trivial").
    pub fn prune(&self) {
        self.entries.lock().retain(|_, e| e.settled.lock().is_none());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: usize) -> DispatchId {
        DispatchId::new(format!("d{n}"))
    }

    fn result(id: DispatchId) -> DispatchResult {
        DispatchResult {
            dispatch_id: id,
            status: DispatchStatus::Completed,
            result: None,
            raw_text: Some("ok".into()),
            cost: Some(0.1),
            duration_ms: 10,
            error: None,
        }
    }

    #[tokio::test]
    async fn await_unknown_id_errors() {
        let tracker = DispatchTracker::new();
        let err = tracker.await_result(&id(1)).await.unwrap_err();
        assert!(matches!(err, RuntimeError::DispatchNotFound(_)));
    }

    #[tokio::test]
    async fn await_resolves_after_complete() {
        let tracker = Arc::new(DispatchTracker::new());
        tracker.track(id(1), RoleName::new("worker"));
        let waiter = Arc::clone(&tracker);
        let handle = tokio::spawn(async move { waiter.await_result(&id(1)).await });
        tracker.complete(&id(1), result(id(1)));
        let got = handle.await.unwrap().unwrap();
        assert_eq!(got.dispatch_id, id(1));
    }

    #[test]
    fn prune_drops_settled_entries_only() {
        let tracker = DispatchTracker::new();
        tracker.track(id(1), RoleName::new("worker"));
        tracker.track(id(2), RoleName::new("worker"));
        tracker.complete(&id(1), result(id(1)));
        tracker.prune();
        assert!(!tracker.has(&id(1)));
        assert!(tracker.has(&id(2)));
    }
}
