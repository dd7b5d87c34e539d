// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `collabot daemon` — start/stop/status for `collabotd`, grounded on the
//! teacher's `commands/daemon.rs` (same subcommand shape), trimmed of the
//! version-mismatch-restart logic the teacher needs for a multi-binary
//! release cadence Collabot doesn't have yet.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::daemon_process;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start collabotd in the background if it isn't already running
    Start,
    /// Stop a running collabotd
    Stop,
    /// Report whether collabotd is reachable
    Status,
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        DaemonCommand::Start => start(format).await,
        DaemonCommand::Stop => stop(format).await,
        DaemonCommand::Status => status(format).await,
    }
}

async fn start(format: OutputFormat) -> Result<()> {
    match DaemonClient::connect() {
        Ok(_) => {
            print_status(format, true, "already running");
            return Ok(());
        }
        Err(crate::error::ClientError::DaemonNotRunning) => {}
        Err(e) => return Err(e.into()),
    }

    DaemonClient::connect_or_start().await?;
    print_status(format, true, "started");
    Ok(())
}

async fn stop(format: OutputFormat) -> Result<()> {
    let lock_path = DaemonClient::lock_path()?;
    if !lock_path.exists() {
        print_status(format, false, "not running");
        return Ok(());
    }
    daemon_process::stop_daemon_sync(&lock_path);
    print_status(format, false, "stopped");
    Ok(())
}

async fn status(format: OutputFormat) -> Result<()> {
    let running = DaemonClient::connect().is_ok();
    print_status(format, running, if running { "running" } else { "not running" });
    Ok(())
}

fn print_status(format: OutputFormat, running: bool, message: &str) {
    match format {
        OutputFormat::Text => println!("{message}"),
        OutputFormat::Json => crate::output::print_json(&serde_json::json!({
            "running": running,
            "message": message,
        })),
    }
}
