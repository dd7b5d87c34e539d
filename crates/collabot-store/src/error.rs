// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed dispatch file {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed role definition {path}: {reason}")]
    CorruptRole { path: String, reason: String },
    #[error("dispatch not found: {0}")]
    DispatchNotFound(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("role not found: {0}")]
    RoleNotFound(String),
    #[error("no active draft")]
    NoActiveDraft,
    #[error("draft already active: {0}")]
    DraftAlreadyActive(String),
    #[error("reconciliation found more than one active draft")]
    MultipleActiveDrafts,
}
