// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `collabot draft` — the `draft`/`undraft`/`get_draft_status` RPCs (spec
//! §6, §4.8): start, end, and inspect the instance-wide draft session.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::output::{format_duration_ms, print_json, OutputFormat};

#[derive(Args)]
pub struct DraftArgs {
    #[command(subcommand)]
    pub command: DraftCommand,
}

#[derive(Subcommand)]
pub enum DraftCommand {
    /// Start a new draft session
    Start {
        role: String,
        project: String,
        task: String,
    },
    /// Close the active draft session
    Stop,
    /// Report whether a draft session is active
    Status,
}

pub async fn handle(command: DraftCommand, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match command {
        DraftCommand::Start { role, project, task } => start(client, &role, &project, &task, format).await,
        DraftCommand::Stop => stop(client, format).await,
        DraftCommand::Status => status(client, format).await,
    }
}

async fn start(client: &DaemonClient, role: &str, project: &str, task: &str, format: OutputFormat) -> Result<()> {
    let result = client.draft(role, project, task).await?;
    match format {
        OutputFormat::Text => println!(
            "draft session {} started on task {} ({})",
            result.session_id, result.task_slug, result.project
        ),
        OutputFormat::Json => print_json(&result),
    }
    Ok(())
}

async fn stop(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let result = client.undraft().await?;
    match format {
        OutputFormat::Text => println!(
            "draft session {} closed: {} turn(s), ${:.2}, {}",
            result.session_id,
            result.turns,
            result.cost,
            format_duration_ms(result.duration_ms)
        ),
        OutputFormat::Json => print_json(&result),
    }
    Ok(())
}

async fn status(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let result = client.draft_status().await?;
    match format {
        OutputFormat::Text => {
            if result.active {
                println!("draft session active");
                if let Some(session) = &result.session {
                    println!("{}", serde_json::to_string_pretty(session)?);
                }
            } else {
                println!("no active draft session");
            }
        }
        OutputFormat::Json => print_json(&result),
    }
    Ok(())
}
