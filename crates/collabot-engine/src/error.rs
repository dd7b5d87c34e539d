// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime error taxonomy (spec §7), mirrored onto the app-specific JSON-RPC
//! error codes by `collabot-daemon`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown project: {0}")]
    UnknownProject(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("role {role} is not permitted on project {project}")]
    RoleNotPermitted { role: String, project: String },
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("dispatch not found: {0}")]
    DispatchNotFound(String),
    #[error("agent pool is at capacity")]
    PoolAtCapacity,
    #[error("a draft session is already active")]
    DraftAlreadyActive,
    #[error("no active draft session")]
    NoActiveDraft,
    #[error("provider '{0}' is already registered")]
    DuplicateProviderName(String),
    #[error("agent adapter error: {0}")]
    Adapter(#[from] collabot_adapters::AgentAdapterError),
    #[error("store error: {0}")]
    Store(#[from] collabot_store::StoreError),
}
