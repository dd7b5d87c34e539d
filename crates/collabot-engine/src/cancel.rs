// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation handle bound to one dispatch's scope (spec §5 "Cancellation
//! plumbing": an explicit handle, since Rust has no inherited cancellation
//! context the way some runtimes do). Cancellation is idempotent — a
//! double-`cancel` is a no-op, matching spec §5's explicit requirement.

use collabot_core::AbortReason;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct CancellationHandle {
    inner: Arc<Inner>,
}

struct Inner {
    cancelled: AtomicBool,
    reason: Mutex<Option<AbortReason>>,
    notify: Notify,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                reason: Mutex::new(None),
                notify: Notify::new(),
            }),
        }
    }

    /// Requests cancellation with `reason`. A second call is a no-op and
    /// keeps the first reason.
    pub fn cancel(&self, reason: AbortReason) {
        if self
            .inner
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.inner.reason.lock() = Some(reason);
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<AbortReason> {
        *self.inner.reason.lock()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_is_idempotent_and_keeps_first_reason() {
        let handle = CancellationHandle::new();
        handle.cancel(AbortReason::Stall);
        handle.cancel(AbortReason::External);
        assert_eq!(handle.reason(), Some(AbortReason::Stall));
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let handle = CancellationHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        handle.cancel(AbortReason::External);
        task.await.unwrap();
    }
}
