// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Validation and clamping of raw path payloads.

use atelier_types::{brush_preset, clamp, Author, Path, PathKind, Point};
use serde_json::Value;

use crate::error::PathError;
use crate::svg::parse_svg_path;

/// Stroke width bounds enforced on every path.
pub const STROKE_WIDTH_MIN: f64 = 0.5;
pub const STROKE_WIDTH_MAX: f64 = 30.0;

/// Validate one raw path object and clamp its style and coordinates.
///
/// Rejects unknown kinds, insufficient points, non-finite coordinates, and
/// malformed svg.  Clamps coordinates to canvas bounds, stroke width to
/// `[0.5, 30]`, opacity to `[0, 1]`.  Unknown brush names are dropped
/// silently, as is any brush on an svg path.
pub fn validate_and_clamp(
    data: &Value,
    canvas_width: f64,
    canvas_height: f64,
) -> Result<Path, PathError> {
    let obj = data.as_object().ok_or(PathError::NotAnObject)?;

    let kind_str = obj.get("type").and_then(Value::as_str).unwrap_or("");
    let kind = match kind_str {
        "line" => PathKind::Line,
        "polyline" => PathKind::Polyline,
        "quadratic" => PathKind::Quadratic,
        "cubic" => PathKind::Cubic,
        "svg" => PathKind::Svg,
        other => return Err(PathError::UnknownKind(other.to_string())),
    };

    // Style properties: invalid values degrade to "not set" rather than
    // rejecting the path, matching the tolerance for agent-produced JSON.
    let mut brush = obj
        .get("brush")
        .and_then(Value::as_str)
        .filter(|name| brush_preset(name).is_some())
        .map(str::to_string);
    let color = obj
        .get("color")
        .and_then(Value::as_str)
        .map(str::to_string);
    let stroke_width = obj
        .get("stroke_width")
        .and_then(Value::as_f64)
        .filter(|w| w.is_finite())
        .map(|w| clamp(w, STROKE_WIDTH_MIN, STROKE_WIDTH_MAX));
    let opacity = obj
        .get("opacity")
        .and_then(Value::as_f64)
        .filter(|o| o.is_finite())
        .map(|o| clamp(o, 0.0, 1.0));

    if kind == PathKind::Svg {
        let d = obj
            .get("d")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PathError::MalformedSvg("missing d-string".into()))?;
        parse_svg_path(d)?;
        // Brushes only apply to point-based paths.
        brush = None;
        return Ok(Path {
            kind,
            points: Vec::new(),
            d: Some(d.to_string()),
            author: Author::Agent,
            color,
            stroke_width,
            opacity,
            brush,
        });
    }

    let raw_points = obj
        .get("points")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut points = Vec::with_capacity(raw_points.len());
    for (index, pt) in raw_points.iter().enumerate() {
        let x = pt.get("x").and_then(Value::as_f64);
        let y = pt.get("y").and_then(Value::as_f64);
        match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => {
                points.push(Point::new(x, y).clamped(canvas_width, canvas_height));
            }
            _ => return Err(PathError::BadPoint { index }),
        }
    }

    if points.len() < kind.min_points() {
        return Err(PathError::TooFewPoints {
            kind: kind.as_str(),
            need: kind.min_points(),
            got: points.len(),
        });
    }

    Ok(Path {
        kind,
        points,
        d: None,
        author: Author::Agent,
        color,
        stroke_width,
        opacity,
        brush,
    })
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
