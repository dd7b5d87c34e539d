// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Captured events: the closed event-kind set across the five categories
//! named in spec §4.1 (agent activity, session lifecycle, harness
//! interventions, user interaction, system observations).

use crate::dispatch::{AbortReason, DispatchEnvelope};
use crate::ids::{CorrelationId, EventId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display truncation length for assistant text/thinking blocks (spec §4.1
/// step 3).
pub const TEXT_DISPLAY_TRUNCATION: usize = 2000;

/// Truncation length for error snippets pushed into the non-retryable
/// detector's window (spec §4.1 step 3).
pub const ERROR_SNIPPET_TRUNCATION: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolResultStatus {
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Repeat,
    PingPong,
    NonRetryable,
}

/// Truncate to at most `n` bytes on a char boundary, matching the teacher's
/// `ShortId::short` truncation discipline.
pub fn truncate(s: &str, n: usize) -> String {
    if s.len() <= n {
        return s.to_string();
    }
    let mut end = n;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Collapse runs of whitespace to single spaces and trim, used when pushing
/// error snippets into the non-retryable detector's window (spec §4.1 step 3).
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The closed event set. Serializes as `{"type": "agent:text", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    // -- agent activity --
    #[serde(rename = "agent:text")]
    AgentText { text: String, truncated: bool },

    #[serde(rename = "agent:thinking")]
    AgentThinking { text: String, truncated: bool },

    #[serde(rename = "agent:tool_call")]
    AgentToolCall {
        correlation_id: CorrelationId,
        tool: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        metadata: HashMap<String, serde_json::Value>,
    },

    #[serde(rename = "agent:tool_result")]
    AgentToolResult {
        correlation_id: CorrelationId,
        status: ToolResultStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_snippet: Option<String>,
    },

    // -- session lifecycle --
    #[serde(rename = "session:init")]
    SessionInit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },

    #[serde(rename = "session:compaction")]
    SessionCompaction,

    #[serde(rename = "session:rate_limit")]
    SessionRateLimit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    #[serde(rename = "session:complete")]
    SessionComplete {
        status: crate::dispatch::ResultStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },

    // -- harness interventions --
    #[serde(rename = "harness:warning")]
    HarnessWarning {
        detector: DetectorKind,
        message: String,
    },

    #[serde(rename = "harness:kill")]
    HarnessKill {
        detector: Option<DetectorKind>,
        reason: AbortReason,
    },

    // -- user interaction --
    #[serde(rename = "user:prompt")]
    UserPrompt { text: String },

    #[serde(rename = "user:cancel")]
    UserCancel,

    // -- system observations --
    #[serde(rename = "system:files_persisted")]
    SystemFilesPersisted { paths: Vec<String> },

    #[serde(rename = "system:hook")]
    SystemHook {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    #[serde(rename = "system:status")]
    SystemStatus { message: String },
}

impl EventKind {
    /// Tag string as it appears on the wire, for log lines and tests.
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::AgentText { .. } => "agent:text",
            EventKind::AgentThinking { .. } => "agent:thinking",
            EventKind::AgentToolCall { .. } => "agent:tool_call",
            EventKind::AgentToolResult { .. } => "agent:tool_result",
            EventKind::SessionInit { .. } => "session:init",
            EventKind::SessionCompaction => "session:compaction",
            EventKind::SessionRateLimit { .. } => "session:rate_limit",
            EventKind::SessionComplete { .. } => "session:complete",
            EventKind::HarnessWarning { .. } => "harness:warning",
            EventKind::HarnessKill { .. } => "harness:kill",
            EventKind::UserPrompt { .. } => "user:prompt",
            EventKind::UserCancel => "user:cancel",
            EventKind::SystemFilesPersisted { .. } => "system:files_persisted",
            EventKind::SystemHook { .. } => "system:hook",
            EventKind::SystemStatus { .. } => "system:status",
        }
    }
}

/// A single captured event: time-sortable id, timestamp, and the closed-set
/// payload (spec §3 "Captured event").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedEvent {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl CapturedEvent {
    pub fn new(id: EventId, timestamp: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            id,
            timestamp,
            kind,
        }
    }
}

/// The on-disk unit: one dispatch's envelope plus its full event sequence
/// (spec §3 "Dispatch file"). Self-contained and independently readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchFile {
    pub envelope: DispatchEnvelope,
    #[serde(default)]
    pub events: Vec<CapturedEvent>,
}

impl DispatchFile {
    pub fn new(envelope: DispatchEnvelope) -> Self {
        Self {
            envelope,
            events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "héllo world";
        let t = truncate(s, 3);
        assert!(s.starts_with(&t));
    }

    #[test]
    fn normalize_whitespace_collapses_runs() {
        assert_eq!(normalize_whitespace("a\n\n  b\tc"), "a b c");
    }

    #[test]
    fn event_kind_round_trips_through_json() {
        let kind = EventKind::AgentToolCall {
            correlation_id: CorrelationId::new("corr-1"),
            tool: "Bash".into(),
            target: Some("dotnet build".into()),
            metadata: HashMap::new(),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "agent:tool_call");
        let back: EventKind = serde_json::from_value(json).unwrap();
        assert_eq!(back, kind);
    }

    #[test]
    fn captured_event_flattens_kind_fields_alongside_id_and_timestamp() {
        let event = CapturedEvent::new(
            EventId::new("e1"),
            Utc::now(),
            EventKind::SessionCompaction,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "session:compaction");
        assert_eq!(json["id"], "e1");
    }
}
