// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::{ProviderError, RegistrationError};
use crate::inbound::{InboundHandler, InboundMessage, InboundResult};
use crate::provider::CommunicationProvider;
use collabot_core::provider::{
    ChannelMessage, ChannelMessageType, ChannelStatus, CommunicationProviderManifest,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

struct Entry {
    provider: Arc<dyn CommunicationProvider>,
    /// `None` means "accept every message type" (spec §16 open question 3).
    accepted_types: Option<Vec<ChannelMessageType>>,
}

/// Owns every registered [`CommunicationProvider`] and fans dispatch
/// traffic out to whichever ones accept it (spec §4.3).
pub struct ProviderRegistry {
    entries: Mutex<IndexMap<String, Entry>>,
    inbound_handler: Mutex<Option<Arc<dyn InboundHandler>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            inbound_handler: Mutex::new(None),
        }
    }

    pub fn register(
        &self,
        provider: Arc<dyn CommunicationProvider>,
        accepted_types: Option<Vec<ChannelMessageType>>,
    ) -> Result<(), RegistrationError> {
        let id = provider.manifest().id;

        if let Some(types) = &accepted_types {
            if types.is_empty() {
                return Err(RegistrationError::EmptyAcceptedTypes(id));
            }
        }

        let mut entries = self.entries.lock();
        if entries.contains_key(&id) {
            return Err(RegistrationError::DuplicateId(id));
        }
        entries.insert(
            id,
            Entry {
                provider,
                accepted_types,
            },
        );
        Ok(())
    }

    pub fn unregister(&self, id: &str) -> bool {
        self.entries.lock().shift_remove(id).is_some()
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn CommunicationProvider>> {
        self.entries.lock().get(id).map(|e| Arc::clone(&e.provider))
    }

    pub fn providers(&self) -> Vec<CommunicationProviderManifest> {
        self.entries
            .lock()
            .values()
            .map(|e| e.provider.manifest())
            .collect()
    }

    pub fn install_inbound_handler(&self, handler: Arc<dyn InboundHandler>) {
        *self.inbound_handler.lock() = Some(handler);
    }

    pub async fn route_inbound(
        &self,
        message: InboundMessage,
    ) -> Result<InboundResult, ProviderError> {
        let handler = self.inbound_handler.lock().clone();
        match handler {
            Some(handler) => handler.handle_inbound(message).await,
            None => Ok(InboundResult::NoActiveDraft),
        }
    }

    pub async fn start_all(&self) -> Vec<(String, ProviderError)> {
        let providers: Vec<_> = self
            .entries
            .lock()
            .iter()
            .map(|(id, e)| (id.clone(), Arc::clone(&e.provider)))
            .collect();

        let mut failures = Vec::new();
        for (id, provider) in providers {
            if let Err(err) = provider.start().await {
                tracing::warn!(provider = %id, error = %err, "provider failed to start");
                failures.push((id, err));
            }
        }
        failures
    }

    pub async fn stop_all(&self) -> Vec<(String, ProviderError)> {
        let providers: Vec<_> = self
            .entries
            .lock()
            .iter()
            .map(|(id, e)| (id.clone(), Arc::clone(&e.provider)))
            .collect();

        let mut failures = Vec::new();
        for (id, provider) in providers {
            if let Err(err) = provider.stop().await {
                tracing::warn!(provider = %id, error = %err, "provider failed to stop");
                failures.push((id, err));
            }
        }
        failures
    }

    /// Sends `message` to every provider that accepts its type. A single
    /// provider's send failure is logged and does not block delivery to
    /// the rest (spec §4.3: providers are best-effort sinks).
    pub async fn broadcast(&self, message: ChannelMessage) {
        let recipients: Vec<_> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, e)| {
                e.accepted_types
                    .as_ref()
                    .map(|types| types.contains(&message.message_type))
                    .unwrap_or(true)
            })
            .map(|(id, e)| (id.clone(), Arc::clone(&e.provider)))
            .collect();

        for (id, provider) in recipients {
            if !provider.is_ready() {
                continue;
            }
            if let Err(err) = provider.send(message.clone()).await {
                tracing::warn!(provider = %id, error = %err, "broadcast send failed");
            }
        }
    }

    /// Broadcasts a draft-session status change (spec §4.8), surfaced on the
    /// wire as a `draft_status` notification.
    pub async fn broadcast_status(&self, channel: String, status: ChannelStatus) {
        self.broadcast(ChannelMessage {
            channel,
            message_type: ChannelMessageType::DraftStatus,
            body: Self::status_body(status),
        })
        .await;
    }

    /// Broadcasts a dispatch's final terminal status (spec §4.1 step 9),
    /// surfaced on the wire as a distinct `status_update` notification so a
    /// client can tell a completed dispatch apart from a draft-session
    /// transition.
    pub async fn broadcast_dispatch_status(&self, channel: String, status: ChannelStatus) {
        self.broadcast(ChannelMessage {
            channel,
            message_type: ChannelMessageType::StatusUpdate,
            body: Self::status_body(status),
        })
        .await;
    }

    fn status_body(status: ChannelStatus) -> String {
        match status {
            ChannelStatus::Running => "running".to_string(),
            ChannelStatus::Completed => "completed".to_string(),
            ChannelStatus::Failed => "failed".to_string(),
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
