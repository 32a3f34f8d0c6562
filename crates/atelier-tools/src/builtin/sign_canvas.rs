// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::{json, Value};

use atelier_strokes::transform_svg_path;
use atelier_types::{Author, Path, PathKind};

use crate::context::ToolContext;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// Hand-crafted cursive signature, ~310×40 units at scale 1.
const SIGNATURE_SVG: &str = "M 0 25 C 5 10 15 5 25 15 C 35 25 20 35 30 30 \
Q 35 28 40 20 L 45 25 C 50 20 55 15 60 20 \
Q 65 25 60 30 C 55 35 50 30 55 25 \
M 75 15 Q 80 10 85 15 C 90 20 85 30 80 30 Q 75 30 75 25 Q 75 20 80 18 \
M 95 30 L 95 15 Q 100 10 105 15 Q 110 20 105 25 Q 100 30 95 30 \
M 115 20 Q 120 15 125 20 Q 130 25 125 30 Q 120 35 115 30 Q 110 25 115 20 \
M 145 25 L 160 25 M 152 15 L 152 35 \
M 175 15 Q 185 15 185 22 Q 185 28 180 30 Q 190 35 195 32 L 200 28 \
M 210 20 Q 215 15 220 20 Q 225 25 220 30 Q 215 35 210 30 Q 205 25 210 20 \
M 235 30 L 235 15 C 240 10 250 15 250 22 Q 250 28 245 30 Q 250 35 250 30 \
M 260 20 Q 265 15 270 20 Q 275 25 270 30 Q 265 35 260 30 Q 255 25 260 20 \
M 280 15 L 280 30 Q 285 35 290 30 L 290 15 \
M 300 15 L 300 30 M 300 20 L 310 30 M 305 25 L 310 15";

/// Untransformed signature extents.
const SIGNATURE_WIDTH: f64 = 310.0;
const SIGNATURE_HEIGHT: f64 = 40.0;

/// Distance from the canvas edge.
const MARGIN: f64 = 20.0;

/// Draw the artist signature at a named corner.
pub struct SignCanvasTool;

#[async_trait]
impl Tool for SignCanvasTool {
    fn name(&self) -> &str {
        "sign_canvas"
    }

    fn description(&self) -> &str {
        "Sign the piece with your signature. Call this once, when the piece \
         is essentially finished, just before naming and marking it done."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "position": {
                    "type": "string",
                    "enum": ["bottom_right", "bottom_left", "bottom_center"],
                    "description": "Where to place the signature",
                    "default": "bottom_right"
                },
                "size": {
                    "type": "string",
                    "enum": ["small", "medium", "large"],
                    "default": "medium"
                },
                "color": {
                    "type": "string",
                    "description": "Optional hex color for the signature"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolOutput {
        let position = call
            .args
            .get("position")
            .and_then(Value::as_str)
            .unwrap_or("bottom_right");
        let size = call.args.get("size").and_then(Value::as_str).unwrap_or("medium");
        let color = call
            .args
            .get("color")
            .and_then(Value::as_str)
            .map(str::to_string);

        let scale = match size {
            "small" => 0.4,
            "large" => 0.8,
            _ => 0.6,
        };
        let sig_width = SIGNATURE_WIDTH * scale;
        let sig_height = SIGNATURE_HEIGHT * scale;
        let canvas_w = ctx.canvas_width as f64;
        let canvas_h = ctx.canvas_height as f64;

        let offset_y = canvas_h - MARGIN - sig_height;
        let offset_x = match position {
            "bottom_left" => MARGIN,
            "bottom_center" => (canvas_w - sig_width) / 2.0,
            _ => canvas_w - MARGIN - sig_width,
        };

        let d = match transform_svg_path(SIGNATURE_SVG, scale, offset_x, offset_y) {
            Ok(d) => d,
            Err(e) => return ToolOutput::err(&call.id, format!("Error: bad signature path: {e}")),
        };

        let path = Path {
            kind: PathKind::Svg,
            points: Vec::new(),
            d: Some(d),
            author: Author::Agent,
            color,
            stroke_width: Some(1.5),
            opacity: None,
            brush: None,
        };

        if let Err(e) = ctx.store.add_strokes(vec![path.clone()]).await {
            return ToolOutput::err(&call.id, format!("Error: failed to store signature: {e}"));
        }
        ctx.draw.draw(vec![path], false).await;

        ToolOutput::ok(
            &call.id,
            format!("Signed the piece ({size} signature, {position})."),
        )
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_strokes::parse_svg_path;

    #[test]
    fn signature_constant_is_valid_subset_svg() {
        assert!(parse_svg_path(SIGNATURE_SVG).is_ok());
    }

    #[test]
    fn scaled_signature_stays_parseable() {
        let d = transform_svg_path(SIGNATURE_SVG, 0.6, 500.0, 550.0).unwrap();
        assert!(parse_svg_path(&d).is_ok());
    }
}
