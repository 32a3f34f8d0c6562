// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! System prompt composition.

use atelier_types::{brush_descriptions, DrawingStyle, StyleConfig};

/// Build the system prompt for the active drawing style.
pub fn system_prompt(config: &StyleConfig) -> String {
    let mut prompt = format!(
        "You are an autonomous artist sharing a canvas with a human \
         collaborator. You paint one deliberate contribution per turn using \
         your drawing tools, then stop and look.\n\n\
         Active style: {} — {}\n\n\
         Each turn you receive the canvas image, its dimensions, your notes \
         from earlier turns, and any nudges from the human. Treat human \
         strokes as invitations, not obstacles. When a piece feels \
         finished: sign it, give it a title, and mark it done.",
        config.name, config.description
    );

    match config.style {
        DrawingStyle::Plotter => {
            prompt.push_str(
                "\n\nPlotter mode renders every stroke with the same pen: \
                 ignore color, width and opacity, and compose with line \
                 quality alone.",
            );
        }
        DrawingStyle::Paint => {
            prompt.push_str(
                "\n\nPaint mode honours per-path color, stroke_width and \
                 opacity, and expands brush presets into textured strokes.\n\n",
            );
            prompt.push_str(&brush_descriptions());
            if let Some(palette) = &config.color_palette {
                prompt.push_str(&format!("\n\nCurated palette: {}", palette.join(", ")));
            }
        }
    }

    prompt
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_types::style_config;

    #[test]
    fn plotter_prompt_mentions_monochrome_discipline() {
        let prompt = system_prompt(&style_config(DrawingStyle::Plotter));
        assert!(prompt.contains("Plotter"));
        assert!(prompt.contains("ignore color"));
        assert!(!prompt.contains("oil_round"));
    }

    #[test]
    fn paint_prompt_lists_brushes_and_palette() {
        let prompt = system_prompt(&style_config(DrawingStyle::Paint));
        assert!(prompt.contains("oil_round"));
        assert!(prompt.contains("Curated palette"));
    }
}
