// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{AgentAdapter, AgentAdapterError, AgentHandle, AgentSpawnConfig};
use crate::message::AgentMessage;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One recorded `spawn` invocation, for assertions in runtime tests.
#[derive(Debug, Clone)]
pub struct AgentCall {
    pub prompt: String,
    pub resume_session_id: Option<String>,
}

/// A scripted [`AgentAdapter`] for tests: records every spawn and replays a
/// pre-loaded sequence of [`AgentMessage`]s instead of running a real agent
/// binary.
pub struct FakeAgentAdapter {
    scripted: Mutex<Vec<Vec<AgentMessage>>>,
    calls: Arc<Mutex<Vec<AgentCall>>>,
    killed: Arc<Mutex<Vec<bool>>>,
}

impl FakeAgentAdapter {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(Vec::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
            killed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues the message sequence the next `spawn()` call will replay.
    pub fn push_script(&self, messages: Vec<AgentMessage>) {
        self.scripted.lock().push(messages);
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.calls.lock().clone()
    }

    pub fn kill_count(&self) -> usize {
        self.killed.lock().iter().filter(|k| **k).count()
    }
}

impl Default for FakeAgentAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentAdapter for FakeAgentAdapter {
    async fn spawn(&self, config: AgentSpawnConfig) -> Result<AgentHandle, AgentAdapterError> {
        self.calls.lock().push(AgentCall {
            prompt: config.prompt,
            resume_session_id: config.resume_session_id,
        });

        let script = self.scripted.lock().pop().unwrap_or_default();
        let (tx, rx) = mpsc::channel(script.len().max(1));
        for message in script {
            let _ = tx.send(message).await;
        }
        drop(tx);

        let killed = Arc::clone(&self.killed);
        let slot = {
            let mut guard = killed.lock();
            guard.push(false);
            guard.len() - 1
        };
        let handle = AgentHandle::new(rx, move || {
            killed.lock()[slot] = true;
            Ok(())
        });
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ContentBlock;

    #[tokio::test]
    async fn replays_scripted_messages_in_order() {
        let adapter = FakeAgentAdapter::new();
        adapter.push_script(vec![
            AgentMessage::Assistant {
                content: vec![ContentBlock::Text {
                    text: "hi".into(),
                }],
            },
            AgentMessage::Result {
                result: None,
                raw_text: "done".into(),
                cost_usd: 0.0,
                input_tokens: 0,
                output_tokens: 0,
                cache_tokens: 0,
                context_window: 0,
                max_output_tokens: 0,
                metadata: Default::default(),
            },
        ]);

        let config = AgentSpawnConfig {
            prompt: "go".into(),
            workspace: std::env::temp_dir(),
            system_prompt: None,
            model_hint: None,
            resume_session_id: None,
            allowed_tools: None,
            max_turns: None,
            max_budget_usd: None,
        };
        let mut handle = adapter.spawn(config).await.unwrap();

        let first = handle.messages.recv().await.unwrap();
        assert!(matches!(first, AgentMessage::Assistant { .. }));
        let second = handle.messages.recv().await.unwrap();
        assert!(matches!(second, AgentMessage::Result { .. }));
        assert!(handle.messages.recv().await.is_none());

        assert_eq!(adapter.calls().len(), 1);
        assert_eq!(adapter.calls()[0].prompt, "go");
    }

    #[tokio::test]
    async fn kill_is_recorded_per_handle() {
        let adapter = FakeAgentAdapter::new();
        let config = AgentSpawnConfig {
            prompt: "go".into(),
            workspace: std::env::temp_dir(),
            system_prompt: None,
            model_hint: None,
            resume_session_id: None,
            allowed_tools: None,
            max_turns: None,
            max_budget_usd: None,
        };
        let handle = adapter.spawn(config).await.unwrap();
        handle.kill().unwrap();
        assert_eq!(adapter.kill_count(), 1);
    }
}
