// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::ProviderError;
use async_trait::async_trait;
use collabot_core::provider::{ChannelMessage, CommunicationProviderManifest};

/// A channel the daemon can push dispatch activity into and, optionally,
/// receive prompts/commands back from (spec §4.3). Implementations own
/// their own lifecycle (a terminal stream, a chat-bridge websocket, a
/// desktop notifier) — the registry only ever calls through this trait.
#[async_trait]
pub trait CommunicationProvider: Send + Sync {
    fn manifest(&self) -> CommunicationProviderManifest;

    /// Starts the provider's connection/listener. Called once by the
    /// registry before the provider's first `send`.
    async fn start(&self) -> Result<(), ProviderError>;

    /// Stops the provider. Called once at daemon shutdown or when the
    /// provider is unregistered.
    async fn stop(&self) -> Result<(), ProviderError>;

    /// Delivers one message. Implementations should not block on slow
    /// downstream sinks longer than their own internal timeout; a failing
    /// send must not block delivery to other providers in the registry.
    async fn send(&self, message: ChannelMessage) -> Result<(), ProviderError>;

    /// Whether the provider is currently able to accept `send` calls.
    fn is_ready(&self) -> bool;
}
