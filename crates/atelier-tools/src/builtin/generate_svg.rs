// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use atelier_strokes::validate_and_clamp;
use atelier_types::Path;

use crate::context::ToolContext;
use crate::sandbox::run_python;
use crate::tool::{Tool, ToolCall, ToolOutput, ToolOutputPart};

/// Cap on stderr echoed back to the agent after a failed run.
const STDERR_CAP: usize = 1000;

/// Generate paths algorithmically by running Python in the sandbox.
pub struct GenerateSvgTool;

#[async_trait]
impl Tool for GenerateSvgTool {
    fn name(&self) -> &str {
        "generate_svg"
    }

    fn description(&self) -> &str {
        "Run Python code to generate paths algorithmically. The code has \
         canvas_width/canvas_height variables, a BRUSHES list, and helpers \
         line(), polyline(), quadratic(), cubic(), svg_path() — finish by \
         calling output_paths([...]) or output_svg_paths([...])."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python code that emits paths via output_paths()"
                },
                "done": {
                    "type": "boolean",
                    "description": "Set to true when the piece is complete",
                    "default": false
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolOutput {
        let Some(code) = call.args.get("code").and_then(Value::as_str).filter(|c| !c.is_empty())
        else {
            return ToolOutput::err(&call.id, "Error: code must be a non-empty string");
        };
        let done = call.args.get("done").and_then(Value::as_bool).unwrap_or(false);

        let result = run_python(code, ctx.canvas_width, ctx.canvas_height, &ctx.sandbox).await;

        if result.exit_code != 0 {
            let mut text = format!("Code execution failed (exit code {})", result.exit_code);
            if !result.stderr.is_empty() {
                let stderr: String = result.stderr.chars().take(STDERR_CAP).collect();
                text.push_str(&format!("\nErrors:\n{stderr}"));
            }
            return ToolOutput::err(&call.id, text);
        }

        let mut parsed: Vec<Path> = Vec::new();
        let mut rejected = 0usize;
        for data in &result.paths {
            match validate_and_clamp(data, ctx.canvas_width as f64, ctx.canvas_height as f64) {
                Ok(path) => parsed.push(path),
                Err(e) => {
                    rejected += 1;
                    debug!("generate_svg rejected path: {e}");
                }
            }
        }

        let mut parts = Vec::new();
        if parsed.is_empty() {
            parts.push(ToolOutputPart::Text(
                "Code executed but no paths were generated. Make sure to call \
                 output_paths() or output_svg_paths() at the end."
                    .to_string(),
            ));
            return ToolOutput::with_parts(&call.id, parts);
        }

        if let Err(e) = ctx.store.add_strokes(parsed.clone()).await {
            return ToolOutput::err(&call.id, format!("Error: failed to store paths: {e}"));
        }
        ctx.draw.draw(parsed.clone(), done).await;

        let mut text = format!("Successfully generated and drew {} paths.", parsed.len());
        if rejected > 0 {
            text.push_str(&format!(" ({rejected} invalid paths were skipped.)"));
        }
        if done {
            text.push_str(" Piece marked as complete.");
        }
        parts.push(ToolOutputPart::Text(text));

        match ctx.snapshot_data_url().await {
            Ok(url) => parts.push(ToolOutputPart::Image(url)),
            Err(e) => warn!("failed to render canvas snapshot: {e}"),
        }

        ToolOutput::with_parts(&call.id, parts)
    }
}
