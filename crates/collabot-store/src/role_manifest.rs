// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Role definition persistence: one TOML document per role under a shared
//! roles directory (supplement — spec.md names "role" throughout §4 but
//! leaves its on-disk shape to "configuration file parsing... mechanical
//! glue", §1's explicit non-goal list; TOML matches the teacher's existing
//! `toml` dependency rather than inventing a new format).

use crate::error::StoreError;
use collabot_core::{Role, RoleName};
use std::path::{Path, PathBuf};

fn manifest_path(roles_dir: &Path, name: &RoleName) -> PathBuf {
    roles_dir.join(format!("{}.toml", name.as_str()))
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

pub fn read_role(roles_dir: &Path, name: &RoleName) -> Result<Option<Role>, StoreError> {
    let path = manifest_path(roles_dir, name);
    match std::fs::read_to_string(&path) {
        Ok(contents) => toml::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::CorruptRole {
                path: path.display().to_string(),
                reason: source.to_string(),
            }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(&path, err)),
    }
}

pub fn write_role(roles_dir: &Path, role: &Role) -> Result<(), StoreError> {
    let path = manifest_path(roles_dir, &role.name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let rendered = toml::to_string_pretty(role).map_err(|source| StoreError::CorruptRole {
        path: path.display().to_string(),
        reason: source.to_string(),
    })?;
    std::fs::write(&path, rendered).map_err(|e| io_err(&path, e))
}

/// Loads every `*.toml` file in `roles_dir`. Entries that fail to parse are
/// skipped with a `tracing::warn!`, mirroring the store's read APIs' general
/// policy of never failing a listing over one bad file
/// (`project_manifest::list_projects`, `dispatch_store::get_dispatch_envelopes`).
pub fn list_roles(roles_dir: &Path) -> Result<Vec<Role>, StoreError> {
    let mut roles = Vec::new();
    let entries = match std::fs::read_dir(roles_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(roles),
        Err(err) => return Err(io_err(roles_dir, err)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| io_err(roles_dir, e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Role>(&contents) {
                Ok(role) => roles.push(role),
                Err(source) => {
                    tracing::warn!(path = %path.display(), error = %source, "skipping malformed role definition");
                }
            },
            Err(source) => {
                tracing::warn!(path = %path.display(), error = %source, "skipping unreadable role definition");
            }
        }
    }
    Ok(roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabot_core::{RoleCategory, ToolSetPermission};

    fn role(name: &str) -> Role {
        Role::new(name, "you are a careful engineer", RoleCategory::Coding)
            .with_permissions(ToolSetPermission::Full)
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        write_role(dir.path(), &role("worker")).unwrap();
        let loaded = read_role(dir.path(), &RoleName::new("worker")).unwrap().unwrap();
        assert_eq!(loaded.name, RoleName::new("worker"));
        assert_eq!(loaded.permissions, ToolSetPermission::Full);
    }

    #[test]
    fn read_missing_role_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_role(dir.path(), &RoleName::new("absent")).unwrap().is_none());
    }

    #[test]
    fn list_roles_skips_malformed_files_and_keeps_good_ones() {
        let dir = tempfile::tempdir().unwrap();
        write_role(dir.path(), &role("lead")).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not = [valid").unwrap();
        let roles = list_roles(dir.path()).unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, RoleName::new("lead"));
    }

    #[test]
    fn list_roles_on_missing_directory_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(list_roles(&missing).unwrap().is_empty());
    }
}
