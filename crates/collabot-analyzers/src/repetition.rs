// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repetition / ping-pong detector (spec §4.3), a pure function over a
//! sliding window of tool calls. Grounded on the teacher's
//! `oj-core/src/decision.rs` pattern: a plain, I/O-free decision function
//! returning an enum the caller turns into engine effects.

use crate::window::SlidingWindow;
use chrono::{DateTime, Utc};
use collabot_core::DetectorKind;
use std::collections::HashMap;

/// One tool call as pushed into the repetition window (spec §4.1 step 3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolCallKey {
    pub tool: String,
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRecord {
    pub key: ToolCallKey,
    pub timestamp: DateTime<Utc>,
}

pub type RepetitionWindow = SlidingWindow<ToolCallRecord>;

pub fn new_repetition_window() -> RepetitionWindow {
    SlidingWindow::new(10)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Warning(DetectorKind),
    Kill(DetectorKind),
}

const KILL_THRESHOLD: usize = 5;
const WARN_THRESHOLD: usize = 3;
const PING_PONG_KILL_LEN: usize = 8;
const PING_PONG_WARN_LEN: usize = 6;

fn pair_counts(window: &RepetitionWindow) -> HashMap<&ToolCallKey, usize> {
    let mut counts: HashMap<&ToolCallKey, usize> = HashMap::new();
    for record in window.iter() {
        *counts.entry(&record.key).or_insert(0) += 1;
    }
    counts
}

/// Length of the longest suffix of the window that strictly alternates
/// between exactly two distinct `(tool, target)` pairs.
fn ping_pong_suffix_len(window: &RepetitionWindow) -> usize {
    let items: Vec<&ToolCallKey> = window.iter().map(|r| &r.key).collect();
    if items.len() < 2 {
        return items.len();
    }
    let rev: Vec<&ToolCallKey> = items.into_iter().rev().collect();
    let a = rev[0];
    let mut other: Option<&ToolCallKey> = None;
    let mut k = 1;
    for item in rev.iter().skip(1) {
        match other {
            None => {
                if *item == a {
                    break;
                }
                other = Some(item);
                k += 1;
            }
            Some(b) => {
                let expected = if k % 2 == 0 { a } else { b };
                if *item == expected {
                    k += 1;
                } else {
                    break;
                }
            }
        }
    }
    k
}

fn repeat_verdict(window: &RepetitionWindow) -> Option<Verdict> {
    let max = pair_counts(window).values().copied().max()?;
    if max >= KILL_THRESHOLD {
        return Some(Verdict::Kill(DetectorKind::Repeat));
    }
    if max >= WARN_THRESHOLD {
        return Some(Verdict::Warning(DetectorKind::Repeat));
    }
    None
}

fn ping_pong_verdict(window: &RepetitionWindow) -> Option<Verdict> {
    let k = ping_pong_suffix_len(window);
    if k >= PING_PONG_KILL_LEN {
        return Some(Verdict::Kill(DetectorKind::PingPong));
    }
    if k >= PING_PONG_WARN_LEN {
        return Some(Verdict::Warning(DetectorKind::PingPong));
    }
    None
}

fn severity(verdict: &Verdict) -> u8 {
    match verdict {
        Verdict::Kill(_) => 2,
        Verdict::Warning(_) => 1,
    }
}

/// Evaluate the repetition/ping-pong verdict for the current window (spec
/// §4.3). The two detectors run independently; whichever reports the more
/// severe verdict (kill over warning) wins, and generic repeat takes
/// precedence over ping-pong when both report the same severity within the
/// same window.
pub fn analyze(window: &RepetitionWindow) -> Option<Verdict> {
    let repeat = repeat_verdict(window);
    let ping_pong = ping_pong_verdict(window);
    match (repeat, ping_pong) {
        (Some(r), Some(p)) => {
            if severity(&p) > severity(&r) {
                Some(p)
            } else {
                Some(r)
            }
        }
        (Some(r), None) => Some(r),
        (None, Some(p)) => Some(p),
        (None, None) => None,
    }
}
