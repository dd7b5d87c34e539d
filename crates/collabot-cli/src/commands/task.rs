// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `collabot task` — `list_tasks`/`get_task_context` (spec §6, §4.5).

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// List every task in a project
    List {
        #[arg(long)]
        project: String,
    },
    /// Print the prior-work narrative a follow-up dispatch would see
    Context {
        slug: String,
        #[arg(long)]
        project: String,
    },
}

pub async fn handle(command: TaskCommand, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match command {
        TaskCommand::List { project } => list(client, &project, format).await,
        TaskCommand::Context { slug, project } => context(client, &slug, &project, format).await,
    }
}

async fn list(client: &DaemonClient, project: &str, format: OutputFormat) -> Result<()> {
    let result = client.list_tasks(project).await?;
    match format {
        OutputFormat::Text => {
            if result.tasks.is_empty() {
                println!("no tasks in project '{project}'");
                return Ok(());
            }
            for task in &result.tasks {
                println!("{}", serde_json::to_string(task)?);
            }
        }
        OutputFormat::Json => print_json(&result),
    }
    Ok(())
}

async fn context(client: &DaemonClient, slug: &str, project: &str, format: OutputFormat) -> Result<()> {
    let result = client.get_task_context(slug, project).await?;
    match format {
        OutputFormat::Text => println!("{}", result.context),
        OutputFormat::Json => print_json(&result),
    }
    Ok(())
}
