// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! collabot-adapters: the `AgentAdapter` boundary between the dispatch
//! runtime and the agent subprocess (spec §1 "explicitly out of scope" — the
//! core only consumes the agent's message stream and final result). Ships a
//! subprocess-spawning implementation that reads newline-delimited JSON from
//! the child's stdout, plus a `FakeAgentAdapter` test double.

pub mod agent;
pub mod message;

pub use agent::{
    AgentAdapter, AgentAdapterError, AgentHandle, AgentSpawnConfig, SubprocessAgentAdapter,
};
pub use message::{AgentMessage, ContentBlock, SystemSubtype};

#[cfg(any(test, feature = "test-support"))]
pub use agent::{AgentCall, FakeAgentAdapter};
