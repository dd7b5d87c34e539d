// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Role definitions: a reusable behavioral profile supplying a system-prompt
//! body, a model-hint alias, and a permission set.

use crate::ids::RoleName;
use serde::{Deserialize, Serialize};

/// Category governing the stall-timer duration (spec §4.3) and whether a
/// dispatch is conversational (draft sessions omit per-turn caps, §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleCategory {
    Coding,
    Conversational,
    Research,
}

impl RoleCategory {
    /// Stall timeout for this category, per spec §4.3.
    pub fn stall_timeout(&self) -> std::time::Duration {
        match self {
            RoleCategory::Coding => std::time::Duration::from_secs(300),
            RoleCategory::Conversational => std::time::Duration::from_secs(180),
            RoleCategory::Research => std::time::Duration::from_secs(420),
        }
    }
}

/// What an agent running under this role is permitted to do via the RPC tool
/// surface (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSetPermission {
    /// `draft_agent` / `await_agent` / `kill_agent` plus the read set.
    Full,
    /// `list_agents` / `list_tasks` / `get_task_context` only.
    Read,
}

/// A loaded role definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub name: RoleName,
    pub system_prompt: String,
    pub category: RoleCategory,
    pub permissions: ToolSetPermission,
    /// Model-hint alias, resolved via the instance alias table (spec §4.1
    /// "Model resolution order").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_hint: Option<String>,
}

impl Role {
    pub fn new(name: impl Into<RoleName>, system_prompt: impl Into<String>, category: RoleCategory) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            category,
            permissions: ToolSetPermission::Read,
            model_hint: None,
        }
    }

    pub fn with_permissions(mut self, permissions: ToolSetPermission) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_model_hint(mut self, hint: impl Into<String>) -> Self {
        self.model_hint = Some(hint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_stall_timeouts_match_spec() {
        assert_eq!(
            RoleCategory::Coding.stall_timeout(),
            std::time::Duration::from_secs(300)
        );
        assert_eq!(
            RoleCategory::Conversational.stall_timeout(),
            std::time::Duration::from_secs(180)
        );
        assert_eq!(
            RoleCategory::Research.stall_timeout(),
            std::time::Duration::from_secs(420)
        );
    }
}
