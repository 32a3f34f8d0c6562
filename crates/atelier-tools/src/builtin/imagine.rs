// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use atelier_render::png_data_url;

use crate::context::ToolContext;
use crate::tool::{Tool, ToolCall, ToolOutput, ToolOutputPart};

/// Generate a reference image with the external provider and save it to the
/// workspace's `references/` directory.
pub struct ImagineTool;

#[async_trait]
impl Tool for ImagineTool {
    fn name(&self) -> &str {
        "imagine"
    }

    fn description(&self) -> &str {
        "Generate a reference image from a text prompt. The image is saved \
         to your workspace and returned so you can study it before drawing. \
         Use this for composition ideas, not as something to trace."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "What to imagine"
                },
                "name": {
                    "type": "string",
                    "description": "Optional file name for the saved reference"
                }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolOutput {
        let Some(prompt) = call
            .args
            .get("prompt")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
        else {
            return ToolOutput::err(&call.id, "Error: prompt must be a non-empty string");
        };

        let Some(provider) = ctx.image_provider.as_ref() else {
            return ToolOutput::err(
                &call.id,
                "Error: Image generation not available. No provider configured.",
            );
        };

        info!(prompt = %prompt.chars().take(100).collect::<String>(), "generating reference image");

        let png = match tokio::time::timeout(ctx.image_timeout, provider.generate(prompt)).await {
            Ok(Ok(png)) => png,
            Ok(Err(e)) => {
                return ToolOutput::err(&call.id, format!("Error: image generation failed: {e}"))
            }
            Err(_) => {
                return ToolOutput::err(
                    &call.id,
                    format!(
                        "Error: Image generation timed out after {}s",
                        ctx.image_timeout.as_secs()
                    ),
                )
            }
        };

        let file_name = reference_file_name(call.args.get("name").and_then(Value::as_str));
        let target = ctx.store.references_dir().join(&file_name);
        if let Err(e) = tokio::fs::write(&target, &png).await {
            // The image is still useful to the agent even if saving failed.
            warn!("failed to save reference image: {e}");
        }

        ToolOutput::with_parts(
            &call.id,
            vec![
                ToolOutputPart::Text(format!("Reference image saved as references/{file_name}")),
                ToolOutputPart::Image(png_data_url(&png)),
            ],
        )
    }
}

/// Sanitize the requested name, or derive one from the current time.
fn reference_file_name(requested: Option<&str>) -> String {
    let stem = requested
        .map(|name| {
            name.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| chrono::Utc::now().format("ref_%Y%m%d_%H%M%S").to_string());
    format!("{stem}.png")
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_sanitized() {
        assert_eq!(
            reference_file_name(Some("misty mountains/../x")),
            "mistymountainsx.png"
        );
        assert_eq!(reference_file_name(Some("study_01")), "study_01.png");
    }

    #[test]
    fn empty_name_falls_back_to_timestamp() {
        let name = reference_file_name(Some("//.."));
        assert!(name.starts_with("ref_"));
        assert!(name.ends_with(".png"));
    }
}
