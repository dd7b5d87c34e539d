// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridges a provider's inbound traffic to the draft-session manager (spec
//! §4.8: "this is how a draft session's reply turn reaches the runtime").
//! `collabot-providers` defines the `InboundHandler` seam but has no
//! knowledge of `collabot-engine`'s `DraftManager` — this is the one
//! instance-wide handler installed on the registry at startup, grounded on
//! the teacher's adapter-layer split (`oj_adapters`'s traits know nothing of
//! `oj_engine`'s runtime either).

use collabot_adapters::AgentAdapter;
use collabot_core::{Clock, ProjectName, Role, RoleName, TaskSlug};
use collabot_engine::DraftManager;
use collabot_providers::{InboundHandler, InboundMessage, InboundResult, ProviderError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Finds the project that owns `task_slug` by scanning every project's task
/// directories. The single-active-draft invariant (spec §3) means at most
/// one task is ever a candidate at a time, so a linear scan is adequate.
fn locate_task(
    projects_dir: &Path,
    task_slug: &TaskSlug,
) -> Result<(ProjectName, PathBuf), String> {
    let projects = collabot_store::project_manifest::list_projects(projects_dir)
        .map_err(|err| err.to_string())?;
    for project in projects {
        let task_dir = collabot_store::dispatch_store::task_dir(projects_dir, &project.name, task_slug);
        if task_dir.join("task.json").exists() {
            let working_dir = project.paths.first().cloned().unwrap_or(task_dir);
            return Ok((project.name, working_dir));
        }
    }
    Err(format!("no project owns task '{task_slug}'"))
}

pub struct DraftInboundHandler<A, C>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    draft_manager: Arc<DraftManager<A, C>>,
    roles: Arc<HashMap<RoleName, Role>>,
    projects_dir: PathBuf,
}

impl<A, C> DraftInboundHandler<A, C>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    pub fn new(
        draft_manager: Arc<DraftManager<A, C>>,
        roles: Arc<HashMap<RoleName, Role>>,
        projects_dir: PathBuf,
    ) -> Self {
        Self {
            draft_manager,
            roles,
            projects_dir,
        }
    }
}

#[async_trait::async_trait]
impl<A, C> InboundHandler for DraftInboundHandler<A, C>
where
    A: AgentAdapter + 'static,
    C: Clock,
{
    async fn handle_inbound(&self, message: InboundMessage) -> Result<InboundResult, ProviderError> {
        let Some(session) = self.draft_manager.active_session() else {
            return Ok(InboundResult::NoActiveDraft);
        };

        let role = self.roles.get(&session.role).cloned().ok_or_else(|| {
            ProviderError::SendFailed(
                message.provider_id.clone(),
                format!("active draft's role '{}' is no longer loaded", session.role),
            )
        })?;

        let (_project, working_dir) = locate_task(&self.projects_dir, &session.task_slug)
            .map_err(|reason| ProviderError::SendFailed(message.provider_id.clone(), reason))?;

        let outcome = self
            .draft_manager
            .resume_draft(&role, working_dir, message.text)
            .await
            .map_err(|err| ProviderError::SendFailed(message.provider_id, err.to_string()))?;

        Ok(InboundResult::RoutedToDraft {
            draft_session_id: outcome.session.session_id.to_string(),
        })
    }
}
