// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent subprocess's newline-delimited JSON wire schema (spec §1: the
//! core only consumes this stream, never re-implements the language-model
//! protocol itself). One line of the child's stdout deserializes to one
//! [`AgentMessage`]; `collabot-engine`'s dispatch runtime classifies each
//! message into a `CapturedEvent` (spec §4.1 step 3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A content block inside an `assistant` or `user` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
}

/// System-message subtype (spec §4.1 step 3: init, compaction, rate limit,
/// files-persisted, hook lifecycle, status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemSubtype {
    Init,
    CompactBoundary,
    RateLimit,
    FilesPersisted,
    Hook,
    Status,
}

/// One line of the agent subprocess's stream-JSON protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    Assistant {
        #[serde(default)]
        content: Vec<ContentBlock>,
    },
    User {
        #[serde(default)]
        content: Vec<ContentBlock>,
    },
    System {
        subtype: SystemSubtype,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        paths: Vec<String>,
    },
    Result {
        /// Raw JSON body of the agent's final structured result, validated
        /// against `StructuredResult` by the runtime (spec §4.1 step 7).
        #[serde(default)]
        result: Option<serde_json::Value>,
        /// Fallback plaintext when `result` does not parse, or is absent.
        #[serde(default)]
        raw_text: String,
        #[serde(default)]
        cost_usd: f64,
        #[serde(default)]
        input_tokens: u64,
        #[serde(default)]
        output_tokens: u64,
        #[serde(default)]
        cache_tokens: u64,
        #[serde(default)]
        context_window: u64,
        #[serde(default)]
        max_output_tokens: u64,
        #[serde(default)]
        metadata: HashMap<String, serde_json::Value>,
    },
}
