// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The socket transport's own [`CommunicationProvider`]: every broadcast
//! `ChannelMessage` is re-wrapped as a `channel_message` or `draft_status`
//! notification and fanned out to every connected client (spec §6's
//! server→client notification set), grounded on `TerminalProvider`'s
//! stateless-lifecycle shape.

use crate::protocol::{notification, RpcNotification};
use async_trait::async_trait;
use collabot_core::provider::{ChannelMessage, ChannelMessageType, CommunicationProviderManifest};
use collabot_providers::{CommunicationProvider, ProviderError};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

pub struct SocketProvider {
    manifest: CommunicationProviderManifest,
    ready: AtomicBool,
    notifications: broadcast::Sender<RpcNotification>,
}

impl SocketProvider {
    pub fn new(manifest: CommunicationProviderManifest, notifications: broadcast::Sender<RpcNotification>) -> Self {
        Self {
            manifest,
            ready: AtomicBool::new(false),
            notifications,
        }
    }
}

#[async_trait]
impl CommunicationProvider for SocketProvider {
    fn manifest(&self) -> CommunicationProviderManifest {
        self.manifest.clone()
    }

    async fn start(&self) -> Result<(), ProviderError> {
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, message: ChannelMessage) -> Result<(), ProviderError> {
        let method = match message.message_type {
            ChannelMessageType::Chat
            | ChannelMessageType::Result
            | ChannelMessageType::Warning
            | ChannelMessageType::ToolUse => notification::CHANNEL_MESSAGE,
            ChannelMessageType::StatusUpdate => notification::STATUS_UPDATE,
            ChannelMessageType::DraftStatus => notification::DRAFT_STATUS,
            ChannelMessageType::ContextCompacted => notification::CONTEXT_COMPACTED,
        };
        let params = json!({
            "channel": message.channel,
            "type": message.message_type,
            "body": message.body,
        });
        // No subscribers is a normal state (a client connected but issuing no
        // requests yet still subscribes in `listener::handle_connection`, but
        // a daemon with zero connections at all has none) so a send error
        // here is not a provider failure.
        let _ = self.notifications.send(RpcNotification::new(method, params));
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Emits a `pool_status` notification for the current pool snapshot. Wired
/// as the callback passed to `AgentPool::on_change` at daemon startup.
pub fn emit_pool_status(notifications: &broadcast::Sender<RpcNotification>, agents: Vec<collabot_core::ActiveAgent>) {
    let params = json!({ "agents": agents });
    let _ = notifications.send(RpcNotification::new(notification::POOL_STATUS, params));
}
