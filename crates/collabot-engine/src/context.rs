// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context reconstruction: a markdown prompt fragment letting a follow-up
//! agent see what prior agents on the same task produced (spec §4.5).

use collabot_core::{DispatchEnvelope, Task};
use std::fmt::Write as _;

/// Builds the markdown fragment described in spec §4.5. `envelopes` must
/// already be in chronological order (as returned by
/// `collabot_store::dispatch_store::get_dispatch_envelopes`).
pub fn build_task_context(task: &Task, envelopes: &[DispatchEnvelope]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", task.name);
    if let Some(description) = &task.description {
        let _ = writeln!(out, "\n{description}");
    }

    for envelope in envelopes {
        let Some(result) = &envelope.result else {
            continue;
        };

        let _ = writeln!(out, "\n## Dispatch by {} ({:?})", envelope.role, result.status);
        let _ = writeln!(out, "\n{}", result.summary);

        write_bullets(&mut out, "Changes", &result.changes);
        write_bullets(&mut out, "Issues", &result.issues);
        write_bullets(&mut out, "Questions", &result.questions);

        if let Some(pr_url) = &result.pr_url {
            let _ = writeln!(out, "\nPR: {pr_url}");
        }
    }

    out
}

fn write_bullets(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{heading}:");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}
