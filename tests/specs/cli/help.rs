//! CLI help output specs.
//!
//! Verify help text displays for the top-level command and every
//! subcommand.

use crate::prelude::*;

#[test]
fn collabot_no_args_shows_usage_and_exits_nonzero() {
    cli().fails().stderr_has("Usage:");
}

#[test]
fn collabot_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn collabot_help_lists_subcommands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("submit")
        .stdout_has("draft")
        .stdout_has("agent")
        .stdout_has("task")
        .stdout_has("project")
        .stdout_has("daemon");
}

#[test]
fn collabot_daemon_help_shows_subcommands() {
    cli()
        .args(&["daemon", "--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("status");
}

#[test]
fn collabot_project_help_shows_subcommands() {
    cli()
        .args(&["project", "--help"])
        .passes()
        .stdout_has("list")
        .stdout_has("create");
}

#[test]
fn collabot_task_help_shows_subcommands() {
    cli()
        .args(&["task", "--help"])
        .passes()
        .stdout_has("list")
        .stdout_has("context");
}

#[test]
fn collabot_submit_help_shows_usage() {
    cli().args(&["submit", "--help"]).passes().stdout_has("Usage:");
}

#[test]
fn collabot_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}
