// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! collabot - CLI front end for the Collabot orchestration daemon.

mod client;
mod commands;
mod daemon_process;
mod env;
mod error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use client::DaemonClient;
use commands::{agent, daemon, draft, project, submit, task};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "collabot", version, about = "Collabot - orchestrates AI coding-agent dispatches")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a one-shot prompt (submit_prompt)
    Submit(submit::SubmitArgs),
    /// Manage the instance-wide draft session
    Draft(draft::DraftArgs),
    /// Inspect or cancel in-flight agent dispatches
    Agent(agent::AgentArgs),
    /// Inspect tasks within a project
    Task(task::TaskArgs),
    /// Manage projects
    Project(project::ProjectArgs),
    /// Manage the collabotd background process
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    // `daemon` subcommands manage the process directly and never need a
    // live RPC connection first.
    if let Commands::Daemon(args) = cli.command {
        return daemon::daemon(args, format).await;
    }

    match cli.command {
        Commands::Submit(args) => {
            let client = DaemonClient::connect_or_start().await?;
            submit::handle(args, &client, format).await
        }
        Commands::Draft(args) => {
            let client = DaemonClient::connect_or_start().await?;
            draft::handle(args.command, &client, format).await
        }
        Commands::Agent(args) => {
            let client = match args.command {
                agent::AgentCommand::Kill { .. } => DaemonClient::connect()?,
                agent::AgentCommand::List => DaemonClient::connect()?,
            };
            agent::handle(args.command, &client, format).await
        }
        Commands::Task(args) => {
            let client = DaemonClient::connect()?;
            task::handle(args.command, &client, format).await
        }
        Commands::Project(args) => {
            let client = match args.command {
                project::ProjectCommand::Create { .. } => DaemonClient::connect_or_start().await?,
                project::ProjectCommand::List => DaemonClient::connect()?,
            };
            project::handle(args.command, &client, format).await
        }
        Commands::Daemon(_) => unreachable!("handled above"),
    }
}
