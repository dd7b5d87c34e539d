// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::ProviderError;
use crate::provider::CommunicationProvider;
use async_trait::async_trait;
use collabot_core::provider::{ChannelMessage, CommunicationProviderManifest};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    Start,
    Stop,
    Send(ChannelMessage),
}

/// A [`CommunicationProvider`] test double: records every lifecycle call
/// and message sent, and can be told to fail on demand.
pub struct FakeProvider {
    manifest: CommunicationProviderManifest,
    ready: AtomicBool,
    calls: Mutex<Vec<ProviderCall>>,
    fail_send: AtomicBool,
}

impl FakeProvider {
    pub fn new(manifest: CommunicationProviderManifest) -> Self {
        Self {
            manifest,
            ready: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            fail_send: AtomicBool::new(false),
        }
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }

    pub fn sent_messages(&self) -> Vec<ChannelMessage> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ProviderCall::Send(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl CommunicationProvider for FakeProvider {
    fn manifest(&self) -> CommunicationProviderManifest {
        self.manifest.clone()
    }

    async fn start(&self) -> Result<(), ProviderError> {
        self.calls.lock().push(ProviderCall::Start);
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.calls.lock().push(ProviderCall::Stop);
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, message: ChannelMessage) -> Result<(), ProviderError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ProviderError::SendFailed(
                self.manifest.id.clone(),
                "simulated failure".into(),
            ));
        }
        self.calls.lock().push(ProviderCall::Send(message));
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

    #[tokio::test]
    async fn fail_send_surfaces_error_without_recording() {
        let provider = FakeProvider::new(CommunicationProviderManifest::new(
            "fake",
            "0.1.0",
            "Fake",
            "test double",
            ProviderType::Socket,
        ));
        provider.set_fail_send(true);
        let result = provider
            .send(ChannelMessage::new("c", ChannelMessageType::Chat, "hi"))
            .await;
        assert!(result.is_err());
        assert!(provider.sent_messages().is_empty());
    }
}
