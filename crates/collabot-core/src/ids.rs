// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain id newtypes, built on the `define_id!` macro.

use crate::id::IdGen;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

crate::define_id! {
    /// Identifier for one dispatch (agent invocation). Time-sortable.
    pub struct DispatchId;
}

crate::define_id! {
    /// Identifier for one captured event. Time-sortable.
    pub struct EventId;
}

crate::define_id! {
    /// Unique project name.
    pub struct ProjectName;
}

crate::define_id! {
    /// Task slug, unique within its owning project.
    pub struct TaskSlug;
}

crate::define_id! {
    /// Role name, referencing a loaded `Role` definition.
    pub struct RoleName;
}

crate::define_id! {
    /// Opaque draft-session identifier.
    pub struct DraftSessionId;
}

crate::define_id! {
    /// Correlation id shared by a tool-call event and its tool-result event.
    pub struct CorrelationId;
}

/// Generates time-sortable ids: a millisecond timestamp prefix followed by a
/// monotonic per-process counter, so ids created in the same process sort the
/// way they were created even within the same millisecond.
#[derive(Clone)]
pub struct MonotonicIdGen {
    counter: Arc<AtomicU64>,
}

impl Default for MonotonicIdGen {
    fn default() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl MonotonicIdGen {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGen for MonotonicIdGen {
    fn next(&self) -> String {
        let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{millis:013}-{seq:06}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_ids_sort_by_creation_order() {
        let gen = MonotonicIdGen::new();
        let a = gen.next();
        let b = gen.next();
        let c = gen.next();
        let mut sorted = vec![c.clone(), a.clone(), b.clone()];
        sorted.sort();
        assert_eq!(sorted, vec![a, b, c]);
    }
}
