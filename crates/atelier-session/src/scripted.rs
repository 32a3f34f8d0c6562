// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use tokio::sync::Mutex;

use atelier_tools::ToolCall;

use crate::event::SessionEvent;
use crate::session::{AgentSession, EventStream, SessionOptions, TurnPrompt};

/// One step of a scripted turn.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Stream this text as a delta.
    Text(String),
    /// Invoke a real tool through the registered registry and context.
    CallTool { name: String, args: Value },
    /// Emit a recoverable error.
    Error(String),
}

/// A pre-scripted session.  Each `query` pops the next script from the
/// front of the queue and replays it, executing scripted tool calls against
/// the real registry so draw hooks and state mutations actually happen.
///
/// Tests inspect `prompts` to assert on what the orchestrator sent.
pub struct ScriptedSession {
    scripts: Mutex<VecDeque<Vec<ScriptStep>>>,
    options: Mutex<Option<Arc<SessionOptions>>>,
    /// Every turn prompt seen by this session, in order.
    pub prompts: Mutex<Vec<TurnPrompt>>,
    connect_count: Mutex<u32>,
}

impl ScriptedSession {
    pub fn new(scripts: Vec<Vec<ScriptStep>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            options: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            connect_count: Mutex::new(0),
        }
    }

    /// Number of times `connect` was called (reconnect assertions).
    pub async fn connects(&self) -> u32 {
        *self.connect_count.lock().await
    }
}

#[async_trait]
impl AgentSession for ScriptedSession {
    async fn connect(&self, options: SessionOptions) -> anyhow::Result<()> {
        *self.options.lock().await = Some(Arc::new(options));
        *self.connect_count.lock().await += 1;
        Ok(())
    }

    async fn query(&self, prompt: TurnPrompt) -> anyhow::Result<EventStream> {
        self.prompts.lock().await.push(prompt);

        let options = self
            .options
            .lock()
            .await
            .clone()
            .ok_or_else(|| anyhow::anyhow!("session not connected"))?;

        let script = self.scripts.lock().await.pop_front().unwrap_or_default();

        // Steps run eagerly: the real SDK executes tools before the result
        // message is observed, so side effects (draw hook, state writes)
        // land before the orchestrator consumes the events.
        let mut events: Vec<anyhow::Result<SessionEvent>> = Vec::new();
        let mut call_seq = 0u32;
        for step in script {
            match step {
                ScriptStep::Text(text) => events.push(Ok(SessionEvent::TextDelta(text))),
                ScriptStep::CallTool { name, args } => {
                    call_seq += 1;
                    let call = ToolCall::new(format!("call_{call_seq}"), &name, args.clone());
                    events.push(Ok(SessionEvent::ToolUse {
                        id: call.id.clone(),
                        name: name.clone(),
                        args,
                    }));
                    let output = options.registry.execute(&options.context, &call).await;
                    events.push(Ok(SessionEvent::ToolResult {
                        call_id: output.call_id,
                        tool_name: name,
                        content: output.content,
                        is_error: output.is_error,
                    }));
                }
                ScriptStep::Error(message) => events.push(Ok(SessionEvent::Error(message))),
            }
        }
        events.push(Ok(SessionEvent::Done));

        Ok(Box::pin(stream::iter(events)))
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        *self.options.lock().await = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        // Read without awaiting; best-effort for the sync accessor.
        self.options.try_lock().map(|o| o.is_some()).unwrap_or(true)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
