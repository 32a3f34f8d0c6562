// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde_json::Value;

/// Events emitted by the agent session during a single turn.
/// The orchestrator consumes these with one exhaustive loop.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A text chunk streamed from the model.
    TextDelta(String),
    /// A complete assistant text block (after streaming finishes).
    TextBlock(String),
    /// The model invoked a tool; dispatch has started.
    ToolUse {
        id: String,
        name: String,
        args: Value,
    },
    /// A tool call finished.
    ToolResult {
        call_id: String,
        tool_name: String,
        content: String,
        is_error: bool,
    },
    /// Out-of-band session information (model switches, notices).
    System(String),
    /// The turn finished normally.
    Done,
    /// A recoverable error; the turn ends but the session survives.
    Error(String),
}
