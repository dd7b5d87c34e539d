// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resettable stall timer (spec §4.3 "Stall detector", §4.1 step 3 "Reset
//! the stall timer"). `collabot-analyzers::stall` supplies the pure
//! category-timeout lookup; this module wraps it in the actual async timer
//! that fires cancellation, since the analyzer crate stays I/O-free.

use crate::cancel::CancellationHandle;
use collabot_core::{AbortReason, RoleCategory};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

/// A running stall timer for one dispatch. Dropping the handle does not stop
/// the background task; call [`StallTimer::stop`] on dispatch end (spec
/// §4.3 "cleared on dispatch end").
pub struct StallTimer {
    reset_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl StallTimer {
    /// Spawns the timer. It cancels `cancel` with [`AbortReason::Stall`] if
    /// `reset` is not called within `category`'s timeout, and stops quietly
    /// once `cancel` is cancelled by any other path.
    pub fn spawn(category: RoleCategory, cancel: CancellationHandle) -> Self {
        let (reset_tx, mut reset_rx) = mpsc::channel(1);
        let timeout = category.stall_timeout();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sleep(timeout) => {
                        cancel.cancel(AbortReason::Stall);
                        break;
                    }
                    received = reset_rx.recv() => {
                        if received.is_none() {
                            break;
                        }
                    }
                    _ = cancel.cancelled() => {
                        break;
                    }
                }
            }
        });

        Self { reset_tx, task }
    }

    /// Resets the countdown. Best-effort: if the timer has already fired or
    /// stopped, this is a no-op.
    pub fn reset(&self) {
        let _ = self.reset_tx.try_send(());
    }

    /// A cloneable reset handle, for use from a task that doesn't own the
    /// timer itself (the dispatch loop runs inside its own spawned task while
    /// `stop` stays the caller's responsibility at finalization).
    pub fn resetter(&self) -> mpsc::Sender<()> {
        self.reset_tx.clone()
    }

    /// Stops the timer without firing cancellation (spec §4.3 "cleared on
    /// dispatch end").
    pub fn stop(self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_stall_cancellation_after_timeout_without_reset() {
        let cancel = CancellationHandle::new();
        let _timer = StallTimer::spawn(RoleCategory::Conversational, cancel.clone());
        tokio::time::advance(Duration::from_secs(181)).await;
        tokio::task::yield_now().await;
        assert!(cancel.is_cancelled());
        assert_eq!(cancel.reason(), Some(AbortReason::Stall));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_postpones_the_fire() {
        let cancel = CancellationHandle::new();
        let timer = StallTimer::spawn(RoleCategory::Conversational, cancel.clone());
        tokio::time::advance(Duration::from_secs(170)).await;
        tokio::task::yield_now().await;
        timer.reset();
        tokio::time::advance(Duration::from_secs(170)).await;
        tokio::task::yield_now().await;
        assert!(!cancel.is_cancelled());
        timer.stop();
    }

    #[tokio::test]
    async fn stop_does_not_fire_cancellation() {
        let cancel = CancellationHandle::new();
        let timer = StallTimer::spawn(RoleCategory::Coding, cancel.clone());
        timer.stop();
        assert!(!cancel.is_cancelled());
    }
}
