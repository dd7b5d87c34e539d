//! `collabot project` RPC round-trip specs.
//!
//! `create_project`/`list_projects` never touch the agent subprocess, so
//! these can run against a real `collabotd` without an agent binary on
//! `$PATH`.

use crate::prelude::*;

#[test]
fn create_project_then_list_shows_it() {
    let temp = Project::empty();
    temp.collabot().args(&["daemon", "start"]).passes();

    temp.collabot()
        .args(&["project", "create", "widgets", "--description", "a project about widgets"])
        .passes()
        .stdout_has("created project 'widgets'");

    let listed = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.collabot().args(&["project", "list"]).passes().stdout().contains("widgets")
    });
    assert!(listed, "newly created project should show up in project list");
}

#[test]
fn project_list_is_empty_for_a_fresh_daemon() {
    let temp = Project::empty();
    temp.collabot().args(&["daemon", "start"]).passes();

    let ready = wait_for(SPEC_WAIT_MAX_MS, || {
        !temp.collabot().args(&["daemon", "status"]).passes().stdout().contains("not running")
    });
    assert!(ready, "daemon should be up before querying projects");

    temp.collabot().args(&["project", "list"]).passes().stdout_has("no projects");
}

#[test]
fn create_project_auto_starts_daemon() {
    let temp = Project::empty();

    // No `daemon start` beforehand: `project create` is an action command and
    // should spawn collabotd itself.
    temp.collabot()
        .args(&["project", "create", "auto-started"])
        .passes()
        .stdout_has("created project 'auto-started'");

    temp.collabot().args(&["daemon", "status"]).passes().stdout_has("running");
}
