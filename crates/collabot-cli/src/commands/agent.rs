// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `collabot agent` — `list_agents`/`kill_agent` (spec §6, §4.4), the
//! operator-facing view onto the in-memory pool.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommand,
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// List every dispatch currently in the pool
    List,
    /// Cancel a running dispatch by id
    Kill { agent_id: String },
}

pub async fn handle(command: AgentCommand, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match command {
        AgentCommand::List => list(client, format).await,
        AgentCommand::Kill { agent_id } => kill(client, &agent_id, format).await,
    }
}

async fn list(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let result = client.list_agents().await?;
    match format {
        OutputFormat::Text => {
            if result.agents.is_empty() {
                println!("no active agents");
                return Ok(());
            }
            for agent in &result.agents {
                println!("{}", serde_json::to_string(agent)?);
            }
        }
        OutputFormat::Json => print_json(&result),
    }
    Ok(())
}

async fn kill(client: &DaemonClient, agent_id: &str, format: OutputFormat) -> Result<()> {
    let result = client.kill_agent(agent_id).await?;
    if !result.success {
        anyhow::bail!("{}", result.message);
    }
    match format {
        OutputFormat::Text => println!("{}", result.message),
        OutputFormat::Json => print_json(&result),
    }
    Ok(())
}
