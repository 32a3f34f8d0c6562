// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use atelier_strokes::validate_and_clamp;
use atelier_types::Path;

use crate::context::ToolContext;
use crate::tool::{Tool, ToolCall, ToolOutput, ToolOutputPart};

/// Validate and draw a batch of paths, then trigger the draw hook.
pub struct DrawPathsTool;

#[async_trait]
impl Tool for DrawPathsTool {
    fn name(&self) -> &str {
        "draw_paths"
    }

    fn description(&self) -> &str {
        "Draw paths on the canvas. Coordinates must be within canvas bounds.\n\
         Path types: line (2 pts), polyline (N pts), quadratic (3 pts), \
         cubic (4 pts), svg (absolute M/L/Q/C d-string).\n\
         In paint mode a path may carry a brush preset plus color, \
         stroke_width (0.5-30) and opacity (0-1) for expressive strokes."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "paths": {
                    "type": "array",
                    "description": "Array of path objects to draw",
                    "items": {
                        "type": "object",
                        "properties": {
                            "type": {
                                "type": "string",
                                "enum": ["line", "polyline", "quadratic", "cubic", "svg"]
                            },
                            "points": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "x": {"type": "number"},
                                        "y": {"type": "number"}
                                    },
                                    "required": ["x", "y"]
                                }
                            },
                            "d": {
                                "type": "string",
                                "description": "SVG d-string for type=svg, absolute M/L/Q/C only"
                            },
                            "brush": {"type": "string"},
                            "color": {"type": "string"},
                            "stroke_width": {"type": "number"},
                            "opacity": {"type": "number"}
                        },
                        "required": ["type"]
                    }
                },
                "done": {
                    "type": "boolean",
                    "description": "Set to true when the piece is complete",
                    "default": false
                }
            },
            "required": ["paths"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolOutput {
        let Some(paths_data) = call.args.get("paths").and_then(Value::as_array) else {
            return ToolOutput::err(&call.id, "Error: paths must be an array");
        };
        let done = call.args.get("done").and_then(Value::as_bool).unwrap_or(false);

        let mut parsed: Vec<Path> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        for (i, data) in paths_data.iter().enumerate() {
            match validate_and_clamp(data, ctx.canvas_width as f64, ctx.canvas_height as f64) {
                Ok(path) => parsed.push(path),
                Err(e) => errors.push(format!("Path {i}: {e}")),
            }
        }

        debug!(
            parsed = parsed.len(),
            errors = errors.len(),
            done,
            "draw_paths"
        );

        // Add strokes to state first so the snapshot below includes them,
        // then hand them to the draw hook for animation.
        if !parsed.is_empty() {
            if let Err(e) = ctx.store.add_strokes(parsed.clone()).await {
                return ToolOutput::err(&call.id, format!("Error: failed to store paths: {e}"));
            }
            ctx.draw.draw(parsed.clone(), done).await;
        } else if done {
            ctx.draw.draw(Vec::new(), true).await;
        }

        let mut parts = Vec::new();
        if !errors.is_empty() {
            let text = format!(
                "Parsed {} paths with {} errors:\n{}",
                parsed.len(),
                errors.len(),
                errors.join("\n")
            );
            if parsed.is_empty() {
                return ToolOutput::err(&call.id, text);
            }
            parts.push(ToolOutputPart::Text(text));
        } else {
            let mut text = format!("Successfully drew {} paths.", parsed.len());
            if done {
                text.push_str(" Piece marked as complete.");
            }
            parts.push(ToolOutputPart::Text(text));
        }

        if !parsed.is_empty() {
            match ctx.snapshot_data_url().await {
                Ok(url) => parts.push(ToolOutputPart::Image(url)),
                Err(e) => warn!("failed to render canvas snapshot: {e}"),
            }
        }

        ToolOutput::with_parts(&call.id, parts)
    }
}
