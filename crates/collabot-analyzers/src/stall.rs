// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stall detection (spec §4.3): a pure predicate over elapsed time since the
//! last observed event. The actual single-shot, resettable timer (an async
//! suspension point per spec §5) lives in `collabot-engine`'s dispatch
//! runtime, which owns the tokio runtime this predicate has no business
//! depending on; this crate only decides whether a given elapsed duration
//! counts as a stall for a category.

use chrono::{DateTime, Utc};
use collabot_core::RoleCategory;
use std::time::Duration;

/// Whether `elapsed` since the last event exceeds `category`'s stall timeout
/// (spec §4.3: coding 300s, conversational 180s per turn, research 420s).
pub fn has_stalled(category: RoleCategory, elapsed: Duration) -> bool {
    elapsed >= category.stall_timeout()
}

/// Convenience wrapper computing elapsed time from two timestamps.
pub fn has_stalled_since(category: RoleCategory, last_event_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let elapsed = (now - last_event_at).to_std().unwrap_or(Duration::ZERO);
    has_stalled(category, elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_exactly_at_category_timeout() {
        assert!(has_stalled(RoleCategory::Coding, Duration::from_secs(300)));
        assert!(!has_stalled(RoleCategory::Coding, Duration::from_secs(299)));
        assert!(has_stalled(
            RoleCategory::Conversational,
            Duration::from_secs(180)
        ));
        assert!(has_stalled(RoleCategory::Research, Duration::from_secs(420)));
    }
}
