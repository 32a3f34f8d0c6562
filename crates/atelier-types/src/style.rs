// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Drawing styles and their configurations.
//!
//! A drawing style decides which path-level attributes are honoured.  Plotter
//! renders everything with the style defaults (human strokes highlighted);
//! paint honours per-path color/width/opacity within clamps and is the only
//! style that expands brushes.

use serde::{Deserialize, Serialize};

/// The active drawing style of a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingStyle {
    /// Monochrome pen plotter style (black lines).
    #[default]
    Plotter,
    /// Full color painting style.
    Paint,
}

/// Fully-resolved style properties for one stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// Hex color.
    pub color: String,
    pub stroke_width: f64,
    /// 0–1 alpha.
    pub opacity: f64,
    pub stroke_linecap: String,
    pub stroke_linejoin: String,
}

impl StrokeStyle {
    fn new(color: &str, stroke_width: f64, opacity: f64) -> Self {
        Self {
            color: color.to_string(),
            stroke_width,
            opacity,
            stroke_linecap: "round".to_string(),
            stroke_linejoin: "round".to_string(),
        }
    }
}

/// Capabilities and defaults of one drawing style, sent to clients verbatim
/// in `init` and `style_change` messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(rename = "type")]
    pub style: DrawingStyle,
    pub name: String,
    /// One-line description used in the agent system prompt.
    pub description: String,
    pub agent_stroke: StrokeStyle,
    pub human_stroke: StrokeStyle,
    pub supports_color: bool,
    pub supports_variable_width: bool,
    pub supports_opacity: bool,
    /// Curated palette offered to the agent; `None` means any color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_palette: Option<Vec<String>>,
}

/// Configuration for the given style.
pub fn style_config(style: DrawingStyle) -> StyleConfig {
    match style {
        DrawingStyle::Plotter => StyleConfig {
            style: DrawingStyle::Plotter,
            name: "Plotter".to_string(),
            description: "Monochrome pen plotter style with crisp black lines".to_string(),
            agent_stroke: StrokeStyle::new("#1a1a2e", 2.5, 1.0),
            human_stroke: StrokeStyle::new("#0066CC", 2.5, 1.0),
            supports_color: false,
            supports_variable_width: false,
            supports_opacity: false,
            color_palette: None,
        },
        DrawingStyle::Paint => StyleConfig {
            style: DrawingStyle::Paint,
            name: "Paint".to_string(),
            description: "Full color painting style with expressive brush strokes".to_string(),
            agent_stroke: StrokeStyle::new("#1a1a2e", 8.0, 0.85),
            human_stroke: StrokeStyle::new("#e94560", 8.0, 0.85),
            supports_color: true,
            supports_variable_width: true,
            supports_opacity: true,
            color_palette: Some(
                [
                    "#1a1a2e", "#e94560", "#7b68ee", "#4ecdc4", "#ffd93d", "#ff6b6b", "#4ade80",
                    "#3b82f6", "#f97316", "#a855f7", "#ffffff",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ),
        },
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
