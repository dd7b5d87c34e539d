// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration-boundary errors for the data model (spec §7 "Configuration
//! errors" — fail fast, clear message, never starts work against invalid
//! configuration).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown project: {0}")]
    UnknownProject(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("role {role} is not permitted on project {project}")]
    RoleNotPermitted { role: String, project: String },
    #[error("invalid manifest at {path}: {reason}")]
    InvalidManifest { path: String, reason: String },
}
