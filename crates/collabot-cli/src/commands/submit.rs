// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `collabot submit` — the `submit_prompt` RPC (spec §6), the entry point
//! for one-shot operator prompts outside a draft session.

use anyhow::Result;
use clap::Args;

use crate::client::DaemonClient;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct SubmitArgs {
    /// The prompt text to dispatch
    pub content: String,

    /// Role to dispatch under (defaults to the daemon's "assistant" role)
    #[arg(long)]
    pub role: Option<String>,

    /// Task slug to attach this dispatch to (a fresh slug is generated if
    /// omitted)
    #[arg(long = "task")]
    pub task_slug: Option<String>,

    /// Project the task belongs to (defaults to "default")
    #[arg(long)]
    pub project: Option<String>,
}

pub async fn handle(args: SubmitArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let result = client
        .submit_prompt(&args.content, args.role.as_deref(), args.task_slug.as_deref(), args.project.as_deref())
        .await?;

    match format {
        OutputFormat::Text => {
            println!("dispatched {} on task {}", result.thread_id, result.task_slug);
        }
        OutputFormat::Json => print_json(&result),
    }
    Ok(())
}
