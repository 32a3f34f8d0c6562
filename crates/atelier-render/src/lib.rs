// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Canvas snapshot rendering.
//!
//! Pure functions from a stroke list to PNG bytes or an SVG document.  These
//! back the agent's `view_canvas` tool, the REST snapshot routes, gallery
//! thumbnails, and the social-share image.  Rendering is an approximation of
//! the client's animated output, not a pixel-exact reproduction.
//!
//! All functions are CPU-bound and synchronous; async callers run them via
//! `spawn_blocking`.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use image::{ImageFormat, Rgb, RgbImage};

use atelier_strokes::interpolate;
use atelier_types::{Author, CanvasState, Path, PathKind, Point, StyleConfig};

pub use error::RenderError;

mod error;

/// Render density used to trace path geometry onto the raster.
const TRACE_STEPS_PER_UNIT: f64 = 1.5;

/// Canvas background.
const BACKGROUND: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);

/// Social-share image dimensions (Open Graph standard).
pub const OG_IMAGE_WIDTH: u32 = 1200;
pub const OG_IMAGE_HEIGHT: u32 = 630;

/// Render the live canvas to PNG using the active style's colors and widths.
///
/// With `highlight_human`, human strokes are drawn in the style's human
/// color so the agent can tell collaborative marks from its own.
pub fn render_canvas_png(
    canvas: &CanvasState,
    config: &StyleConfig,
    highlight_human: bool,
) -> Result<Vec<u8>, RenderError> {
    if canvas.width == 0 || canvas.height == 0 {
        return Err(RenderError::EmptyCanvas {
            width: canvas.width,
            height: canvas.height,
        });
    }

    let mut img = RgbImage::from_pixel(canvas.width, canvas.height, BACKGROUND);
    for path in &canvas.strokes {
        let style = path.effective_style(config);
        // Without highlighting, human strokes render in the agent color.
        let color = if !highlight_human && path.author == Author::Human {
            parse_hex_color(&config.agent_stroke.color)
        } else {
            parse_hex_color(&style.color)
        };
        trace_path(&mut img, path, color, style.stroke_width, 1.0, 0.0, 0.0);
    }
    encode_png(&img)
}

/// Render a bare stroke list in black on white at the given size.
/// Used for gallery thumbnails where style context is not loaded.
pub fn render_strokes_png(
    strokes: &[Path],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyCanvas { width, height });
    }
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    for path in strokes {
        trace_path(&mut img, path, Rgb([0, 0, 0]), 2.0, 1.0, 0.0, 0.0);
    }
    encode_png(&img)
}

/// Render a 1200×630 social-share image: the piece scaled to fit, centred on
/// a white card.
pub fn render_og_image(
    strokes: &[Path],
    canvas_width: u32,
    canvas_height: u32,
) -> Result<Vec<u8>, RenderError> {
    if canvas_width == 0 || canvas_height == 0 {
        return Err(RenderError::EmptyCanvas {
            width: canvas_width,
            height: canvas_height,
        });
    }

    let mut img = RgbImage::from_pixel(OG_IMAGE_WIDTH, OG_IMAGE_HEIGHT, BACKGROUND);

    let margin = 40.0;
    let scale_x = (OG_IMAGE_WIDTH as f64 - 2.0 * margin) / canvas_width as f64;
    let scale_y = (OG_IMAGE_HEIGHT as f64 - 2.0 * margin) / canvas_height as f64;
    let scale = scale_x.min(scale_y);
    let offset_x = (OG_IMAGE_WIDTH as f64 - canvas_width as f64 * scale) / 2.0;
    let offset_y = (OG_IMAGE_HEIGHT as f64 - canvas_height as f64 * scale) / 2.0;

    for path in strokes {
        trace_path(&mut img, path, Rgb([0, 0, 0]), 2.0, scale, offset_x, offset_y);
    }
    encode_png(&img)
}

/// Render the canvas as an SVG document.
pub fn render_canvas_svg(canvas: &CanvasState) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = canvas.width,
        h = canvas.height
    ));
    out.push_str("<rect width=\"100%\" height=\"100%\" fill=\"#FFFFFF\"/>");
    for path in &canvas.strokes {
        if let Some(d) = path_to_svg_d(path) {
            out.push_str(&format!(
                "<path d=\"{d}\" stroke=\"#000000\" stroke-width=\"2\" fill=\"none\"/>"
            ));
        }
    }
    out.push_str("</svg>");
    out
}

/// Express a path as an SVG d-string, or `None` for degenerate paths.
pub fn path_to_svg_d(path: &Path) -> Option<String> {
    match path.kind {
        PathKind::Svg => path.d.clone(),
        PathKind::Quadratic => match path.points.as_slice() {
            [p0, p1, p2] => Some(format!(
                "M {} {} Q {} {} {} {}",
                p0.x, p0.y, p1.x, p1.y, p2.x, p2.y
            )),
            _ => None,
        },
        PathKind::Cubic => match path.points.as_slice() {
            [p0, p1, p2, p3] => Some(format!(
                "M {} {} C {} {} {} {} {} {}",
                p0.x, p0.y, p1.x, p1.y, p2.x, p2.y, p3.x, p3.y
            )),
            _ => None,
        },
        PathKind::Line | PathKind::Polyline => {
            let mut points = path.points.iter();
            let first = points.next()?;
            let mut d = format!("M {} {}", first.x, first.y);
            let mut any = false;
            for p in points {
                d.push_str(&format!(" L {} {}", p.x, p.y));
                any = true;
            }
            any.then_some(d)
        }
    }
}

/// Base64 data URL for embedding a PNG in a multimodal prompt.
pub fn png_data_url(png_bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", B64.encode(png_bytes))
}

/// Plain base64 of PNG bytes (API image blocks carry media type separately).
pub fn png_base64(png_bytes: &[u8]) -> String {
    B64.encode(png_bytes)
}

fn encode_png(img: &RgbImage) -> Result<Vec<u8>, RenderError> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Parse `#rrggbb`; anything else falls back to black.
fn parse_hex_color(hex: &str) -> Rgb<u8> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return Rgb([0, 0, 0]);
    }
    let parse = |range| u8::from_str_radix(&hex[range], 16).unwrap_or(0);
    Rgb([parse(0..2), parse(2..4), parse(4..6)])
}

/// Trace a path onto the raster by stamping discs along its interpolated
/// points.  `scale`/`offset` map canvas units to raster pixels.
fn trace_path(
    img: &mut RgbImage,
    path: &Path,
    color: Rgb<u8>,
    stroke_width: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
) {
    let radius = ((stroke_width * scale) / 2.0).max(0.5);
    for point in interpolate(path, TRACE_STEPS_PER_UNIT / scale.max(f64::MIN_POSITIVE)) {
        let mapped = Point::new(point.x * scale + offset_x, point.y * scale + offset_y);
        stamp_disc(img, mapped, radius, color);
    }
}

fn stamp_disc(img: &mut RgbImage, center: Point, radius: f64, color: Rgb<u8>) {
    let r = radius.ceil() as i64;
    let cx = center.x.round() as i64;
    let cy = center.y.round() as i64;
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx * dx + dy * dy) as f64 <= radius * radius {
                let x = cx + dx;
                let y = cy + dy;
                if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
                    img.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
