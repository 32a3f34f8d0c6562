// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::context::ToolContext;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// Maximum stored title length.
const TITLE_CAP: usize = 100;

/// Record a title for the current piece.
pub struct NamePieceTool;

#[async_trait]
impl Tool for NamePieceTool {
    fn name(&self) -> &str {
        "name_piece"
    }

    fn description(&self) -> &str {
        "Give your completed piece a title. Call this after signing, just \
         before marking the piece done. The title is saved with the piece \
         in the gallery — be evocative, not descriptive."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "The title for this piece"
                }
            },
            "required": ["title"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolOutput {
        let Some(raw) = call
            .args
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            return ToolOutput::err(&call.id, "Error: Please provide a title for the piece");
        };

        let title: String = raw.chars().take(TITLE_CAP).collect();
        if let Err(e) = ctx.store.set_piece_title(title.clone()).await {
            return ToolOutput::err(&call.id, format!("Error: failed to save title: {e}"));
        }
        info!(title = %title, "piece titled");

        ToolOutput::ok(
            &call.id,
            format!("This piece is now titled: \"{title}\""),
        )
    }
}
