// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// Signal that the current piece is complete.
pub struct MarkPieceDoneTool;

#[async_trait]
impl Tool for MarkPieceDoneTool {
    fn name(&self) -> &str {
        "mark_piece_done"
    }

    fn description(&self) -> &str {
        "Signal that the current piece is complete. Call this when you're \
         satisfied with the drawing."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolOutput {
        ctx.draw.draw(Vec::new(), true).await;
        ToolOutput::ok(&call.id, "Piece marked as complete.")
    }
}
