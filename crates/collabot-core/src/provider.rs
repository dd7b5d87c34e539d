// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Communication provider manifest (spec §3, §4.6). The `CommunicationProvider`
//! trait itself lives in `collabot-providers` since it depends on
//! `async-trait` and is a capability boundary — the same split the teacher
//! keeps between `oj_adapters`'s `NotifyAdapter`/`SessionAdapter` traits and
//! the plain id types that live in `oj_core`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Terminal,
    Socket,
    ChatBridge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunicationProviderManifest {
    pub id: String,
    pub version: String,
    pub display_name: String,
    pub description: String,
    pub provider_type: ProviderType,
}

impl CommunicationProviderManifest {
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        provider_type: ProviderType,
    ) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            display_name: display_name.into(),
            description: description.into(),
            provider_type,
        }
    }
}

/// Channel message kinds broadcast through the provider registry (spec §4.1
/// "Broadcast policy during dispatch", §4.6, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMessageType {
    Chat,
    Result,
    Warning,
    ToolUse,
    StatusUpdate,
    DraftStatus,
    ContextCompacted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub channel: String,
    #[serde(rename = "type")]
    pub message_type: ChannelMessageType,
    pub body: String,
}

impl ChannelMessage {
    pub fn new(
        channel: impl Into<String>,
        message_type: ChannelMessageType,
        body: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            message_type,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Running,
    Completed,
    Failed,
}
