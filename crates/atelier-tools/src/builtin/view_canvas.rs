// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ToolContext;
use crate::tool::{Tool, ToolCall, ToolOutput, ToolOutputPart};

/// Return the current canvas as an image.
pub struct ViewCanvasTool;

#[async_trait]
impl Tool for ViewCanvasTool {
    fn name(&self) -> &str {
        "view_canvas"
    }

    fn description(&self) -> &str {
        "View the current canvas state as an image. Human strokes are \
         highlighted so you can tell collaborative marks from your own. \
         Call this anytime to see your work."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolOutput {
        match ctx.snapshot_data_url().await {
            Ok(url) => ToolOutput::with_parts(&call.id, vec![ToolOutputPart::Image(url)]),
            Err(e) => ToolOutput::err(&call.id, format!("Error: failed to render canvas: {e}")),
        }
    }
}
