// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Draft session: a persistent record for a resumable conversational
//! dispatch (spec §3, §4.8).

use crate::ids::{DraftSessionId, RoleName, TaskSlug};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSession {
    pub session_id: DraftSessionId,
    pub role: RoleName,
    pub task_slug: TaskSlug,
    pub channel_id: String,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(default)]
    pub turn_count: u32,
    pub status: DraftStatus,
    #[serde(default)]
    pub cumulative_cost_usd: f64,
    #[serde(default)]
    pub last_input_tokens: u64,
    #[serde(default)]
    pub last_output_tokens: u64,
    #[serde(default)]
    pub context_window: u64,
    #[serde(default)]
    pub max_output_tokens: u64,
}

impl DraftSession {
    pub fn new(
        session_id: DraftSessionId,
        role: RoleName,
        task_slug: TaskSlug,
        channel_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            role,
            task_slug,
            channel_id: channel_id.into(),
            started_at: now,
            last_activity_at: now,
            turn_count: 0,
            status: DraftStatus::Active,
            cumulative_cost_usd: 0.0,
            last_input_tokens: 0,
            last_output_tokens: 0,
            context_window: 0,
            max_output_tokens: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, DraftStatus::Active)
    }

    /// Percentage of the context window consumed by the last turn's input,
    /// per spec §4.8. Returns `0.0` if the context window is unknown.
    pub fn context_percent(&self) -> f64 {
        if self.context_window == 0 {
            return 0.0;
        }
        100.0 * self.last_input_tokens as f64 / self.context_window as f64
    }

    /// Record metrics from one turn's final result message and bump the
    /// activity clock (spec §4.8 "resumeDraft").
    pub fn record_turn(
        &mut self,
        now: DateTime<Utc>,
        cost: f64,
        input_tokens: u64,
        output_tokens: u64,
        context_window: u64,
        max_output_tokens: u64,
    ) {
        self.turn_count += 1;
        self.cumulative_cost_usd += cost;
        self.last_input_tokens = input_tokens;
        self.last_output_tokens = output_tokens;
        self.context_window = context_window;
        self.max_output_tokens = max_output_tokens;
        self.last_activity_at = now;
    }

    pub fn close(&mut self) {
        self.status = DraftStatus::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> DraftSession {
        DraftSession::new(
            DraftSessionId::new("s1"),
            RoleName::new("pairbot"),
            TaskSlug::new("task-1"),
            "chan-1",
            Utc::now(),
        )
    }

    #[test]
    fn new_session_is_active_with_zero_turns() {
        let s = session();
        assert!(s.is_active());
        assert_eq!(s.turn_count, 0);
    }

    #[test]
    fn context_percent_is_zero_with_unknown_window() {
        assert_eq!(session().context_percent(), 0.0);
    }

    #[test]
    fn record_turn_accumulates_cost_and_advances_turn_count() {
        let mut s = session();
        s.record_turn(Utc::now(), 0.5, 1000, 200, 200_000, 8192);
        s.record_turn(Utc::now(), 0.25, 1500, 300, 200_000, 8192);
        assert_eq!(s.turn_count, 2);
        assert!((s.cumulative_cost_usd - 0.75).abs() < f64::EPSILON);
        assert_eq!(s.last_input_tokens, 1500);
        assert_eq!(s.context_percent(), 100.0 * 1500.0 / 200_000.0);
    }
}
