// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! collabot-engine: the dispatch runtime, agent pool, dispatch tracker,
//! context reconstruction, RPC tool surface, and draft-session manager
//! (spec §4.1, §4.4, §4.5, §4.7, §4.8) — the always-on orchestration core.

pub mod cancel;
pub mod context;
pub mod dispatch;
pub mod draft;
pub mod error;
pub mod pool;
pub mod rpc;
pub mod stall;
pub mod tracker;

pub use cancel::CancellationHandle;
pub use context::build_task_context;
pub use dispatch::{DispatchInput, DispatchRuntime, ModelAliases};
pub use draft::{DraftCloseSummary, DraftManager, DraftTurnOutcome};
pub use error::RuntimeError;
pub use pool::AgentPool;
pub use rpc::{FullTools, ReadTools, ToolSurfaceError};
pub use stall::StallTimer;
pub use tracker::{DispatchResult, DispatchTracker};
