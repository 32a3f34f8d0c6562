// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Path interpolation — the points the client animates.
//!
//! Density is expressed as steps per unit of path length.  Line and polyline
//! segments are subdivided linearly; quadratic and cubic beziers are sampled
//! by parameter with the step count derived from the control-polygon length.
//! Endpoints are always preserved.

use atelier_types::{Path, PathKind, Point};

use crate::svg::{parse_svg_path, SvgSegment};

/// Minimum samples for a curved segment, so short curves still bend.
const MIN_CURVE_STEPS: usize = 8;

/// Interpolate a path into animation points at the given density.
pub fn interpolate(path: &Path, steps_per_unit: f64) -> Vec<Point> {
    match path.kind {
        PathKind::Line | PathKind::Polyline => interpolate_polyline(&path.points, steps_per_unit),
        PathKind::Quadratic => match path.points.as_slice() {
            [p0, p1, p2] => sample_quadratic(*p0, *p1, *p2, steps_per_unit),
            _ => path.points.clone(),
        },
        PathKind::Cubic => match path.points.as_slice() {
            [p0, p1, p2, p3] => sample_cubic(*p0, *p1, *p2, *p3, steps_per_unit),
            _ => path.points.clone(),
        },
        PathKind::Svg => path
            .d
            .as_deref()
            .map(|d| interpolate_svg(d, steps_per_unit))
            .unwrap_or_default(),
    }
}

fn interpolate_polyline(points: &[Point], steps_per_unit: f64) -> Vec<Point> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let mut out = vec![points[0]];
    for pair in points.windows(2) {
        append_linear(&mut out, pair[0], pair[1], steps_per_unit);
    }
    out
}

/// Append evenly-spaced points from `from` (exclusive) to `to` (inclusive).
fn append_linear(out: &mut Vec<Point>, from: Point, to: Point, steps_per_unit: f64) {
    let steps = ((from.distance_to(&to) * steps_per_unit).ceil() as usize).max(1);
    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        out.push(lerp(from, to, t));
    }
}

fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

fn curve_steps(control_polygon_len: f64, steps_per_unit: f64) -> usize {
    ((control_polygon_len * steps_per_unit).ceil() as usize).max(MIN_CURVE_STEPS)
}

fn sample_quadratic(p0: Point, p1: Point, p2: Point, steps_per_unit: f64) -> Vec<Point> {
    let len = p0.distance_to(&p1) + p1.distance_to(&p2);
    let steps = curve_steps(len, steps_per_unit);
    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let u = 1.0 - t;
            Point::new(
                u * u * p0.x + 2.0 * u * t * p1.x + t * t * p2.x,
                u * u * p0.y + 2.0 * u * t * p1.y + t * t * p2.y,
            )
        })
        .collect()
}

fn sample_cubic(p0: Point, p1: Point, p2: Point, p3: Point, steps_per_unit: f64) -> Vec<Point> {
    let len = p0.distance_to(&p1) + p1.distance_to(&p2) + p2.distance_to(&p3);
    let steps = curve_steps(len, steps_per_unit);
    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let u = 1.0 - t;
            let (u2, t2) = (u * u, t * t);
            Point::new(
                u2 * u * p0.x + 3.0 * u2 * t * p1.x + 3.0 * u * t2 * p2.x + t2 * t * p3.x,
                u2 * u * p0.y + 3.0 * u2 * t * p1.y + 3.0 * u * t2 * p2.y + t2 * t * p3.y,
            )
        })
        .collect()
}

fn interpolate_svg(d: &str, steps_per_unit: f64) -> Vec<Point> {
    // The d-string was validated at ingest; a parse failure here yields an
    // empty animation rather than a crash.
    let Ok(segments) = parse_svg_path(d) else {
        return Vec::new();
    };

    let mut out: Vec<Point> = Vec::new();
    let mut current = Point::new(0.0, 0.0);
    for seg in segments {
        match seg {
            SvgSegment::MoveTo(p) => {
                out.push(p);
                current = p;
            }
            SvgSegment::LineTo(p) => {
                append_linear(&mut out, current, p, steps_per_unit);
                current = p;
            }
            SvgSegment::Quadratic { ctrl, end } => {
                let samples = sample_quadratic(current, ctrl, end, steps_per_unit);
                out.extend(samples.into_iter().skip(1));
                current = end;
            }
            SvgSegment::Cubic { ctrl1, ctrl2, end } => {
                let samples = sample_cubic(current, ctrl1, ctrl2, end, steps_per_unit);
                out.extend(samples.into_iter().skip(1));
                current = end;
            }
        }
    }
    out
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_types::Path;

    fn polyline(points: Vec<Point>) -> Path {
        Path::polyline(points)
    }

    #[test]
    fn line_endpoints_are_preserved() {
        let path = Path {
            kind: PathKind::Line,
            ..polyline(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)])
        };
        let pts = interpolate(&path, 1.0);
        assert_eq!(pts.first().copied(), Some(Point::new(0.0, 0.0)));
        assert_eq!(pts.last().copied(), Some(Point::new(10.0, 0.0)));
    }

    #[test]
    fn density_controls_sample_count() {
        let path = Path {
            kind: PathKind::Line,
            ..polyline(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)])
        };
        let sparse = interpolate(&path, 0.1);
        let dense = interpolate(&path, 1.0);
        // 100 units: 0.1 steps/unit → 10 segments; 1.0 → 100 segments.
        assert_eq!(sparse.len(), 11);
        assert_eq!(dense.len(), 101);
    }

    #[test]
    fn polyline_interpolates_every_segment() {
        let path = polyline(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ]);
        let pts = interpolate(&path, 1.0);
        assert_eq!(pts.len(), 21);
        assert_eq!(pts[10], Point::new(10.0, 0.0));
        assert_eq!(*pts.last().unwrap(), Point::new(10.0, 10.0));
    }

    #[test]
    fn quadratic_passes_through_endpoints() {
        let path = Path {
            kind: PathKind::Quadratic,
            ..polyline(vec![
                Point::new(0.0, 0.0),
                Point::new(50.0, 100.0),
                Point::new(100.0, 0.0),
            ])
        };
        let pts = interpolate(&path, 0.5);
        assert_eq!(pts.first().copied(), Some(Point::new(0.0, 0.0)));
        assert_eq!(pts.last().copied(), Some(Point::new(100.0, 0.0)));
        // The curve must actually bend towards the control point.
        let mid = pts[pts.len() / 2];
        assert!(mid.y > 25.0);
    }

    #[test]
    fn cubic_passes_through_endpoints() {
        let path = Path {
            kind: PathKind::Cubic,
            ..polyline(vec![
                Point::new(0.0, 0.0),
                Point::new(30.0, 60.0),
                Point::new(70.0, 60.0),
                Point::new(100.0, 0.0),
            ])
        };
        let pts = interpolate(&path, 0.5);
        assert_eq!(pts.first().copied(), Some(Point::new(0.0, 0.0)));
        assert_eq!(pts.last().copied(), Some(Point::new(100.0, 0.0)));
    }

    #[test]
    fn short_curves_still_get_minimum_samples() {
        let path = Path {
            kind: PathKind::Quadratic,
            ..polyline(vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(2.0, 0.0),
            ])
        };
        let pts = interpolate(&path, 0.1);
        assert!(pts.len() >= MIN_CURVE_STEPS + 1);
    }

    #[test]
    fn svg_path_follows_segments() {
        let path = Path {
            kind: PathKind::Svg,
            d: Some("M 0 0 L 10 0 Q 15 10 20 0".to_string()),
            ..polyline(vec![])
        };
        let pts = interpolate(&path, 1.0);
        assert_eq!(pts.first().copied(), Some(Point::new(0.0, 0.0)));
        assert_eq!(pts.last().copied(), Some(Point::new(20.0, 0.0)));
        assert!(pts.len() > 10);
    }

    #[test]
    fn degenerate_paths_come_back_unchanged() {
        let single = polyline(vec![Point::new(5.0, 5.0)]);
        assert_eq!(interpolate(&single, 1.0), vec![Point::new(5.0, 5.0)]);
        let empty = polyline(vec![]);
        assert!(interpolate(&empty, 1.0).is_empty());
    }
}
