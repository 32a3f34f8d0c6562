// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::style::{DrawingStyle, StrokeStyle, StyleConfig};

/// The kinds of drawable paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    Line,
    Polyline,
    Quadratic,
    Cubic,
    /// Raw SVG path d-string (restricted absolute M/L/Q/C subset).
    Svg,
}

impl PathKind {
    /// Minimum number of points required for a valid path of this kind.
    /// Svg paths carry their geometry in the d-string and need none.
    pub fn min_points(&self) -> usize {
        match self {
            PathKind::Line | PathKind::Polyline => 2,
            PathKind::Quadratic => 3,
            PathKind::Cubic => 4,
            PathKind::Svg => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PathKind::Line => "line",
            PathKind::Polyline => "polyline",
            PathKind::Quadratic => "quadratic",
            PathKind::Cubic => "cubic",
            PathKind::Svg => "svg",
        }
    }
}

/// Who drew a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    #[default]
    Agent,
    Human,
}

/// A drawable stroke.  Paths are immutable once added to a canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    #[serde(rename = "type")]
    pub kind: PathKind,
    #[serde(default)]
    pub points: Vec<Point>,
    /// SVG d-string, only for `PathKind::Svg`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default)]
    pub author: Author,
    /// Hex color override (paint mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// Brush preset name (paint mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brush: Option<String>,
}

impl Path {
    /// A bare polyline with default styling.
    pub fn polyline(points: Vec<Point>) -> Self {
        Self {
            kind: PathKind::Polyline,
            points,
            d: None,
            author: Author::Agent,
            color: None,
            stroke_width: None,
            opacity: None,
            brush: None,
        }
    }

    /// Resolve the effective stroke style under the given style config.
    ///
    /// Plotter always uses the style defaults.  Paint honours path-level
    /// overrides only for the capabilities the config declares.
    pub fn effective_style(&self, config: &StyleConfig) -> StrokeStyle {
        let default = match self.author {
            Author::Agent => &config.agent_stroke,
            Author::Human => &config.human_stroke,
        };

        if config.style == DrawingStyle::Plotter {
            return default.clone();
        }

        StrokeStyle {
            color: match (&self.color, config.supports_color) {
                (Some(c), true) => c.clone(),
                _ => default.color.clone(),
            },
            stroke_width: match (self.stroke_width, config.supports_variable_width) {
                (Some(w), true) => w,
                _ => default.stroke_width,
            },
            opacity: match (self.opacity, config.supports_opacity) {
                (Some(o), true) => o,
                _ => default.opacity,
            },
            stroke_linecap: default.stroke_linecap.clone(),
            stroke_linejoin: default.stroke_linejoin.clone(),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::style_config;

    fn paint_path() -> Path {
        Path {
            color: Some("#ff0000".to_string()),
            stroke_width: Some(12.0),
            opacity: Some(0.5),
            ..Path::polyline(vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)])
        }
    }

    #[test]
    fn min_points_per_kind() {
        assert_eq!(PathKind::Line.min_points(), 2);
        assert_eq!(PathKind::Polyline.min_points(), 2);
        assert_eq!(PathKind::Quadratic.min_points(), 3);
        assert_eq!(PathKind::Cubic.min_points(), 4);
        assert_eq!(PathKind::Svg.min_points(), 0);
    }

    #[test]
    fn kind_serializes_as_type_field() {
        let json = serde_json::to_value(Path::polyline(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
        ]))
        .unwrap();
        assert_eq!(json["type"], "polyline");
    }

    #[test]
    fn author_defaults_to_agent_when_missing() {
        let path: Path = serde_json::from_str(
            r#"{"type":"line","points":[{"x":0,"y":0},{"x":1,"y":1}]}"#,
        )
        .unwrap();
        assert_eq!(path.author, Author::Agent);
    }

    #[test]
    fn plotter_ignores_path_overrides() {
        let cfg = style_config(DrawingStyle::Plotter);
        let style = paint_path().effective_style(&cfg);
        assert_eq!(style, cfg.agent_stroke);
    }

    #[test]
    fn paint_honours_path_overrides() {
        let cfg = style_config(DrawingStyle::Paint);
        let style = paint_path().effective_style(&cfg);
        assert_eq!(style.color, "#ff0000");
        assert_eq!(style.stroke_width, 12.0);
        assert_eq!(style.opacity, 0.5);
    }

    #[test]
    fn human_paths_use_human_defaults() {
        let cfg = style_config(DrawingStyle::Plotter);
        let path = Path {
            author: Author::Human,
            ..Path::polyline(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)])
        };
        assert_eq!(path.effective_style(&cfg), cfg.human_stroke);
    }
}
