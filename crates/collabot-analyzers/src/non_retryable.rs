// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-retryable-error detector (spec §4.3), a pure function over a sliding
//! window of error triplets.

use crate::window::SlidingWindow;
use std::collections::HashMap;

/// `(tool, target, error-snippet)` as pushed after an error tool-result
/// (spec §4.1 step 3: snippet truncated to 200 chars and
/// whitespace-normalized).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorTriplet {
    pub tool: String,
    pub target: Option<String>,
    pub error_snippet: String,
}

pub type NonRetryableWindow = SlidingWindow<ErrorTriplet>;

pub fn new_non_retryable_window() -> NonRetryableWindow {
    SlidingWindow::new(20)
}

/// Returns the triplet the moment it has been seen twice identically in the
/// window (spec §4.3: "first occurrence returns null; second occurrence of
/// the identical triplet returns a detection").
pub fn analyze(window: &NonRetryableWindow) -> Option<ErrorTriplet> {
    let mut counts: HashMap<&ErrorTriplet, usize> = HashMap::new();
    for triplet in window.iter() {
        let count = counts.entry(triplet).or_insert(0);
        *count += 1;
        if *count >= 2 {
            return Some(triplet.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triplet(tool: &str, target: &str, err: &str) -> ErrorTriplet {
        ErrorTriplet {
            tool: tool.to_string(),
            target: Some(target.to_string()),
            error_snippet: err.to_string(),
        }
    }

    #[test]
    fn first_occurrence_returns_null() {
        let mut w = new_non_retryable_window();
        w.push(triplet("Bash", "make", "permission denied"));
        assert_eq!(analyze(&w), None);
    }

    #[test]
    fn second_identical_occurrence_returns_detection() {
        let mut w = new_non_retryable_window();
        w.push(triplet("Bash", "make", "permission denied"));
        w.push(triplet("Edit", "a.rs", "unrelated"));
        w.push(triplet("Bash", "make", "permission denied"));
        assert_eq!(
            analyze(&w),
            Some(triplet("Bash", "make", "permission denied"))
        );
    }

    #[test]
    fn distinct_snippets_for_same_tool_and_target_do_not_trigger() {
        let mut w = new_non_retryable_window();
        w.push(triplet("Bash", "make", "error A"));
        w.push(triplet("Bash", "make", "error B"));
        assert_eq!(analyze(&w), None);
    }
}
