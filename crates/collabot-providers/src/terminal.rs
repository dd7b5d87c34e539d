// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::ProviderError;
use crate::provider::CommunicationProvider;
use async_trait::async_trait;
use collabot_core::provider::{ChannelMessage, CommunicationProviderManifest};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Writes every broadcast message to stdout. The default provider every
/// daemon instance registers (spec §4.3): stateless, always ready, no
/// inbound traffic.
pub struct TerminalProvider {
    manifest: CommunicationProviderManifest,
    ready: AtomicBool,
    #[cfg(any(test, feature = "test-support"))]
    sent: Mutex<Vec<ChannelMessage>>,
}

impl TerminalProvider {
    pub fn new(manifest: CommunicationProviderManifest) -> Self {
        Self {
            manifest,
            ready: AtomicBool::new(false),
            #[cfg(any(test, feature = "test-support"))]
            sent: Mutex::new(Vec::new()),
        }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn sent_messages(&self) -> Vec<ChannelMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl CommunicationProvider for TerminalProvider {
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
        println!("[{}] {:?}: {}", message.channel, message.message_type, message.body);
        #[cfg(any(test, feature = "test-support"))]
        self.sent.lock().push(message);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabot_core::provider::{ChannelMessageType, ProviderType};

    fn manifest() -> CommunicationProviderManifest {
        CommunicationProviderManifest::new(
            "terminal",
            "0.1.0",
            "Terminal",
            "stdout provider",
            ProviderType::Terminal,
        )
    }

    #[tokio::test]
    async fn records_sent_messages_after_start() {
        let provider = TerminalProvider::new(manifest());
        assert!(!provider.is_ready());
        provider.start().await.unwrap();
        assert!(provider.is_ready());

        provider
            .send(ChannelMessage::new("c1", ChannelMessageType::Chat, "hi"))
            .await
            .unwrap();

        assert_eq!(provider.sent_messages().len(), 1);
    }
}
