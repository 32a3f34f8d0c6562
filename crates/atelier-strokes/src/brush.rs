// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Brush expansion for paint-like stroke rendering.
//!
//! A single path carrying a brush preset becomes the main stroke plus bristle
//! sub-strokes offset perpendicular to the stroke direction.  The jitter RNG
//! is seeded from the path content, so expanding the same path twice yields
//! identical geometry.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use atelier_types::{brush_preset, clamp, BrushPreset, DrawingStyle, Path, PathKind, Point};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::validate::{STROKE_WIDTH_MAX, STROKE_WIDTH_MIN};

/// Scale factor for edge-noise displacement relative to stroke width.
const EDGE_NOISE_SCALE: f64 = 0.3;
/// Per-bristle opacity jitter range.
const BRISTLE_OPACITY_VARIANCE: (f64, f64) = (0.8, 1.2);
/// Randomness factor applied to bristle offsets.
const BRISTLE_OFFSET_RANDOMNESS: f64 = 0.1;

/// Expand one path under the active drawing style.
///
/// Only paint mode expands; plotter mode, svg paths, paths without a known
/// brush, and paths with fewer than two points come back unchanged.  The
/// first returned path is always the main stroke, followed by bristles.
pub fn expand(path: &Path, style: DrawingStyle, canvas_width: f64, canvas_height: f64) -> Vec<Path> {
    if style != DrawingStyle::Paint {
        return vec![path.clone()];
    }
    let Some(preset) = path.brush.as_deref().and_then(brush_preset) else {
        return vec![path.clone()];
    };
    if path.kind == PathKind::Svg || path.points.len() < 2 {
        return vec![path.clone()];
    }

    let mut rng = StdRng::seed_from_u64(path_seed(path));

    let base_width = clamp_width(path.stroke_width.unwrap_or(preset.base_width));
    let widths: Vec<f64> = velocity_widths(&path.points, base_width, preset.pressure_response)
        .into_iter()
        .map(clamp_width)
        .collect();

    let mut points = path.points.clone();
    if preset.edge_noise > 0.0 {
        points = apply_edge_noise(&points, preset.edge_noise, base_width, &mut rng);
    }
    points = clamp_points(points, canvas_width, canvas_height);

    let avg_width = clamp_width(average(&widths).unwrap_or(preset.base_width));
    let main_opacity = path.opacity.unwrap_or(1.0) * preset.main_opacity;

    let mut result = vec![Path {
        kind: PathKind::Polyline,
        points: points.clone(),
        d: None,
        author: path.author,
        color: path.color.clone(),
        stroke_width: Some(avg_width),
        opacity: Some(main_opacity),
        brush: path.brush.clone(),
    }];

    if preset.bristle_count > 0 {
        result.extend(bristle_strokes(
            &points,
            avg_width,
            preset,
            path,
            canvas_width,
            canvas_height,
            &mut rng,
        ));
    }

    result
}

/// Deterministic seed from the path's geometry and styling.
fn path_seed(path: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();
    for p in &path.points {
        p.x.to_bits().hash(&mut hasher);
        p.y.to_bits().hash(&mut hasher);
    }
    path.brush.hash(&mut hasher);
    path.color.hash(&mut hasher);
    path.stroke_width.map(f64::to_bits).hash(&mut hasher);
    hasher.finish()
}

fn clamp_width(value: f64) -> f64 {
    clamp(value, STROKE_WIDTH_MIN, STROKE_WIDTH_MAX)
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Width at each point derived from drawing speed: slow movement deposits
/// more paint (wider), fast movement spreads it thin.
fn velocity_widths(points: &[Point], base_width: f64, pressure_response: f64) -> Vec<f64> {
    if points.len() <= 1 || pressure_response == 0.0 {
        return vec![base_width; points.len()];
    }

    let distances: Vec<f64> = points
        .windows(2)
        .map(|pair| pair[0].distance_to(&pair[1]))
        .collect();
    let max_dist = distances.iter().cloned().fold(0.0_f64, f64::max).max(f64::MIN_POSITIVE);

    let min_ratio = 1.0 - 0.5 * pressure_response;
    let max_ratio = 1.0 + 0.3 * pressure_response;

    let mut widths = Vec::with_capacity(points.len());
    widths.push(base_width * max_ratio);
    for dist in distances {
        let normalized_velocity = dist / max_dist;
        let ratio = max_ratio - normalized_velocity * (max_ratio - min_ratio);
        widths.push(base_width * ratio);
    }
    widths
}

/// Random displacement for rough edges.  Endpoints are damped so the stroke
/// still starts and ends where it was drawn.
fn apply_edge_noise(
    points: &[Point],
    noise_amount: f64,
    stroke_width: f64,
    rng: &mut StdRng,
) -> Vec<Point> {
    let max_displacement = stroke_width * noise_amount * EDGE_NOISE_SCALE;
    let last = points.len().saturating_sub(1);

    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let edge_factor = if i == 0 || i == last {
                0.3
            } else if i == 1 || i + 2 == points.len() {
                0.6
            } else {
                1.0
            };
            let dx = rng.gen_range(-max_displacement..=max_displacement) * edge_factor;
            let dy = rng.gen_range(-max_displacement..=max_displacement) * edge_factor;
            Point::new(point.x + dx, point.y + dy)
        })
        .collect()
}

fn clamp_points(points: Vec<Point>, canvas_width: f64, canvas_height: f64) -> Vec<Point> {
    points
        .into_iter()
        .map(|p| p.clamped(canvas_width, canvas_height))
        .collect()
}

fn bristle_strokes(
    points: &[Point],
    avg_width: f64,
    preset: &BrushPreset,
    original: &Path,
    canvas_width: f64,
    canvas_height: f64,
    rng: &mut StdRng,
) -> Vec<Path> {
    let total_spread = avg_width * preset.bristle_spread;
    let bristle_width = clamp_width(avg_width * preset.bristle_width_ratio);
    let count = preset.bristle_count as usize;

    let mut bristles = Vec::with_capacity(count);
    for i in 0..count {
        // Distribute bristles evenly across the spread, centred on the
        // stroke, with a small random wobble per bristle.
        let offset_ratio = if count == 1 {
            0.0
        } else {
            (i as f64 / (count - 1) as f64) - 0.5
        };
        let random_offset =
            rng.gen_range(-BRISTLE_OFFSET_RANDOMNESS..=BRISTLE_OFFSET_RANDOMNESS) * total_spread;
        let offset = offset_ratio * total_spread + random_offset;

        let bristle_points = clamp_points(offset_path(points, offset), canvas_width, canvas_height);

        let jitter = rng.gen_range(BRISTLE_OPACITY_VARIANCE.0..=BRISTLE_OPACITY_VARIANCE.1);
        let opacity = (preset.bristle_opacity * jitter).min(1.0);

        bristles.push(Path {
            kind: PathKind::Polyline,
            points: bristle_points,
            d: None,
            author: original.author,
            color: original.color.clone(),
            stroke_width: Some(bristle_width),
            opacity: Some(opacity),
            brush: Some(preset.name.to_string()),
        });
    }
    bristles
}

/// Offset a polyline perpendicular to its local direction.
fn offset_path(points: &[Point], offset: f64) -> Vec<Point> {
    if points.len() < 2 || offset == 0.0 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let (dx, dy) = if i == 0 {
                (points[1].x - point.x, points[1].y - point.y)
            } else if i == last {
                (point.x - points[i - 1].x, point.y - points[i - 1].y)
            } else {
                // Average of adjacent directions keeps the offset smooth.
                (
                    points[i + 1].x - points[i - 1].x,
                    points[i + 1].y - points[i - 1].y,
                )
            };
            let length = (dx * dx + dy * dy).sqrt().max(f64::MIN_POSITIVE);
            let perp_x = -dy / length;
            let perp_y = dx / length;
            Point::new(point.x + perp_x * offset, point.y + perp_y * offset)
        })
        .collect()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
