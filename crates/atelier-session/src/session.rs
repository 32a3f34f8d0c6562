// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

use atelier_tools::{ToolContext, ToolRegistry};

use crate::event::SessionEvent;

pub type EventStream = Pin<Box<dyn Stream<Item = anyhow::Result<SessionEvent>> + Send>>;

/// Connection options for one agent session.
pub struct SessionOptions {
    /// System prompt derived from the active drawing style.
    pub system_prompt: String,
    /// Tools the agent may call.
    pub registry: Arc<ToolRegistry>,
    /// Per-workspace context threaded into every tool call.
    pub context: Arc<ToolContext>,
    /// Working directory scoping any filesystem access of the session.
    pub workspace_dir: Option<PathBuf>,
    /// Request partial-message streaming (text deltas).
    pub partial_messages: bool,
}

/// One turn's multimodal prompt: canvas text context plus the rendered
/// canvas image.
#[derive(Debug, Clone)]
pub struct TurnPrompt {
    pub text: String,
    /// Base64 PNG of the current canvas.
    pub canvas_png_base64: Option<String>,
}

/// The contract over the external LLM agent.
///
/// Implementations own the transport and the tool-dispatch loop.  The
/// orchestrator never sees wire formats, only [`SessionEvent`]s.
#[async_trait]
pub trait AgentSession: Send + Sync {
    /// Establish (or re-establish) the session.  Calling connect on a live
    /// session replaces its options — used when the drawing style changes.
    async fn connect(&self, options: SessionOptions) -> anyhow::Result<()>;

    /// Deliver the turn prompt and stream the response events.
    async fn query(&self, prompt: TurnPrompt) -> anyhow::Result<EventStream>;

    /// Tear the session down; the next turn reconnects fresh.
    async fn disconnect(&self) -> anyhow::Result<()>;

    fn is_connected(&self) -> bool;
}
