// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! collabot-analyzers: pure decision functions run synchronously by the
//! dispatch runtime after classifying each agent message (spec §4.3) — no
//! I/O, no shared state, deterministic over their input window.

pub mod non_retryable;
pub mod repetition;
pub mod stall;
pub mod window;

pub use non_retryable::{new_non_retryable_window, ErrorTriplet, NonRetryableWindow};
pub use repetition::{new_repetition_window, RepetitionWindow, ToolCallKey, ToolCallRecord, Verdict};
pub use stall::{has_stalled, has_stalled_since};
pub use window::SlidingWindow;
