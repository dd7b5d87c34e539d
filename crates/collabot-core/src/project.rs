// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project: a persistent container owning filesystem paths and permitted
//! roles (spec §3).

use crate::ids::{ProjectName, RoleName};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: ProjectName,
    #[serde(default)]
    pub description: Option<String>,
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub roles: Vec<RoleName>,
}

impl Project {
    pub fn new(name: impl Into<ProjectName>) -> Self {
        Self {
            name: name.into(),
            description: None,
            paths: Vec::new(),
            roles: Vec::new(),
        }
    }

    pub fn allows_role(&self, role: &RoleName) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
