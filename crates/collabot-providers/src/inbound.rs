// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::ProviderError;
use async_trait::async_trait;

/// A message a provider received from its external channel (a chat reply,
/// a terminal line) and is forwarding into the engine (spec §4.8: this is
/// how a draft session's "reply" turn reaches the runtime).
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub provider_id: String,
    pub channel: String,
    pub text: String,
}

/// What the engine did with an [`InboundMessage`], reported back so the
/// provider can surface acknowledgement/error state to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundResult {
    RoutedToDraft { draft_session_id: String },
    NoActiveDraft,
}

/// Installed once on the registry; every provider's inbound traffic is
/// funneled through the same handler rather than each provider talking to
/// the engine directly.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle_inbound(
        &self,
        message: InboundMessage,
    ) -> Result<InboundResult, ProviderError>;
}
