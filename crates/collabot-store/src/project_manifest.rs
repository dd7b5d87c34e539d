// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project manifest persistence (spec §6: `<projectsDir>/<name>/project.yaml`
//! "or equivalent" — the teacher's dependency table has no YAML crate, so
//! Collabot keeps the teacher's existing JSON-on-disk idiom here, same as
//! task/dispatch/draft files).

use crate::error::StoreError;
use collabot_core::{Project, ProjectName};
use std::path::{Path, PathBuf};

fn manifest_path(projects_dir: &Path, name: &ProjectName) -> PathBuf {
    projects_dir.join(name.as_str()).join("project.json")
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

pub fn read_project(
    projects_dir: &Path,
    name: &ProjectName,
) -> Result<Option<Project>, StoreError> {
    let path = manifest_path(projects_dir, name);
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.display().to_string(),
                source,
            }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(&path, err)),
    }
}

pub fn write_project(projects_dir: &Path, project: &Project) -> Result<(), StoreError> {
    let path = manifest_path(projects_dir, &project.name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let json = serde_json::to_string_pretty(project).map_err(|source| StoreError::Corrupt {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(&path, json).map_err(|e| io_err(&path, e))
}

/// List every project directory under `projects_dir` that carries a
/// `project.json`.
pub fn list_projects(projects_dir: &Path) -> Result<Vec<Project>, StoreError> {
    let mut projects = Vec::new();
    let entries = match std::fs::read_dir(projects_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(projects),
        Err(err) => return Err(io_err(projects_dir, err)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| io_err(projects_dir, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let candidate = entry.path().join("project.json");
        if let Ok(contents) = std::fs::read_to_string(&candidate) {
            if let Ok(project) = serde_json::from_str(&contents) {
                projects.push(project);
            }
        }
    }
    Ok(projects)
}

/// List every task directory under a project's `tasks/` folder.
pub fn list_task_dirs(projects_dir: &Path, project: &ProjectName) -> Result<Vec<PathBuf>, StoreError> {
    let tasks_dir = projects_dir.join(project.as_str()).join("tasks");
    let mut dirs = Vec::new();
    let entries = match std::fs::read_dir(&tasks_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(dirs),
        Err(err) => return Err(io_err(&tasks_dir, err)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| io_err(&tasks_dir, e))?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}
