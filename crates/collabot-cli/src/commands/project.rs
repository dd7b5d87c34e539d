// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `collabot project` — `list_projects`/`create_project` (spec §6, §3).

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// List every known project
    List,
    /// Create a new project
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Role names permitted on this project (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
    },
}

pub async fn handle(command: ProjectCommand, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match command {
        ProjectCommand::List => list(client, format).await,
        ProjectCommand::Create { name, description, roles } => {
            create(client, &name, description.as_deref(), &roles, format).await
        }
    }
}

async fn list(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let result = client.list_projects().await?;
    match format {
        OutputFormat::Text => {
            if result.projects.is_empty() {
                println!("no projects");
                return Ok(());
            }
            for project in &result.projects {
                println!("{}", serde_json::to_string(project)?);
            }
        }
        OutputFormat::Json => print_json(&result),
    }
    Ok(())
}

async fn create(
    client: &DaemonClient,
    name: &str,
    description: Option<&str>,
    roles: &[String],
    format: OutputFormat,
) -> Result<()> {
    let result = client.create_project(name, description, roles).await?;
    match format {
        OutputFormat::Text => println!("created project '{}' with roles: {}", result.name, result.roles.join(", ")),
        OutputFormat::Json => print_json(&result),
    }
    Ok(())
}
