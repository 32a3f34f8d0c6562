// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Brush preset registry for paint mode.
//!
//! Each preset describes how a single intentional stroke is expanded into a
//! main stroke plus bristle sub-strokes.  The registry is fixed: clients and
//! the agent refer to presets by name, and unknown names are dropped at
//! validation time.

/// Immutable description of one brush.
#[derive(Debug, Clone, PartialEq)]
pub struct BrushPreset {
    pub name: &'static str,
    pub description: &'static str,
    /// Default stroke width in canvas units when the path carries none.
    pub base_width: f64,
    /// Number of bristle sub-strokes; 0 means the main stroke only.
    pub bristle_count: u32,
    /// Bristle offsets span `base_width * bristle_spread` across the stroke.
    pub bristle_spread: f64,
    /// Bristle width as a fraction of the main stroke width.
    pub bristle_width_ratio: f64,
    /// Base opacity for bristle strokes (jittered per bristle).
    pub bristle_opacity: f64,
    /// 0–1 intensity of random edge displacement.
    pub edge_noise: f64,
    /// 0–1: how strongly velocity modulates stroke width.
    pub pressure_response: f64,
    /// Multiplier applied to the path opacity for the main stroke.
    pub main_opacity: f64,
}

/// The fixed brush registry, ordered for prompt listings.
pub const BRUSH_PRESETS: &[BrushPreset] = &[
    BrushPreset {
        name: "oil_round",
        description: "Classic round brush with visible bristle texture (good for blending)",
        base_width: 8.0,
        bristle_count: 4,
        bristle_spread: 0.8,
        bristle_width_ratio: 0.25,
        bristle_opacity: 0.4,
        edge_noise: 0.2,
        pressure_response: 0.5,
        main_opacity: 0.85,
    },
    BrushPreset {
        name: "oil_flat",
        description: "Flat brush with parallel marks (good for blocking shapes)",
        base_width: 12.0,
        bristle_count: 7,
        bristle_spread: 1.0,
        bristle_width_ratio: 0.2,
        bristle_opacity: 0.45,
        edge_noise: 0.15,
        pressure_response: 0.3,
        main_opacity: 0.9,
    },
    BrushPreset {
        name: "oil_filbert",
        description: "Rounded flat brush (good for organic shapes)",
        base_width: 10.0,
        bristle_count: 5,
        bristle_spread: 0.7,
        bristle_width_ratio: 0.3,
        bristle_opacity: 0.4,
        edge_noise: 0.1,
        pressure_response: 0.4,
        main_opacity: 0.88,
    },
    BrushPreset {
        name: "watercolor",
        description: "Translucent with soft edges (good for washes)",
        base_width: 14.0,
        bristle_count: 3,
        bristle_spread: 1.2,
        bristle_width_ratio: 0.6,
        bristle_opacity: 0.15,
        edge_noise: 0.4,
        pressure_response: 0.2,
        main_opacity: 0.35,
    },
    BrushPreset {
        name: "dry_brush",
        description: "Scratchy, broken strokes (good for texture)",
        base_width: 9.0,
        bristle_count: 8,
        bristle_spread: 1.1,
        bristle_width_ratio: 0.15,
        bristle_opacity: 0.5,
        edge_noise: 0.5,
        pressure_response: 0.6,
        main_opacity: 0.55,
    },
    BrushPreset {
        name: "palette_knife",
        description: "Sharp edges, thick paint (good for impasto)",
        base_width: 16.0,
        bristle_count: 2,
        bristle_spread: 0.3,
        bristle_width_ratio: 0.8,
        bristle_opacity: 0.7,
        edge_noise: 0.05,
        pressure_response: 0.1,
        main_opacity: 0.95,
    },
    BrushPreset {
        name: "ink",
        description: "Pressure-sensitive with elegant taper (good for calligraphy)",
        base_width: 4.0,
        bristle_count: 0,
        bristle_spread: 0.0,
        bristle_width_ratio: 1.0,
        bristle_opacity: 1.0,
        edge_noise: 0.0,
        pressure_response: 0.9,
        main_opacity: 1.0,
    },
    BrushPreset {
        name: "pencil",
        description: "Thin, consistent lines (good for sketching)",
        base_width: 1.5,
        bristle_count: 0,
        bristle_spread: 0.0,
        bristle_width_ratio: 1.0,
        bristle_opacity: 1.0,
        edge_noise: 0.1,
        pressure_response: 0.2,
        main_opacity: 0.9,
    },
    BrushPreset {
        name: "charcoal",
        description: "Smudgy edges with texture (good for value studies)",
        base_width: 6.0,
        bristle_count: 4,
        bristle_spread: 0.9,
        bristle_width_ratio: 0.4,
        bristle_opacity: 0.3,
        edge_noise: 0.6,
        pressure_response: 0.4,
        main_opacity: 0.7,
    },
    BrushPreset {
        name: "marker",
        description: "Solid color with slight edge bleed",
        base_width: 7.0,
        bristle_count: 1,
        bristle_spread: 0.5,
        bristle_width_ratio: 0.9,
        bristle_opacity: 0.2,
        edge_noise: 0.15,
        pressure_response: 0.0,
        main_opacity: 0.92,
    },
    BrushPreset {
        name: "airbrush",
        description: "Very soft edges (good for gradients)",
        base_width: 18.0,
        bristle_count: 6,
        bristle_spread: 1.4,
        bristle_width_ratio: 0.5,
        bristle_opacity: 0.1,
        edge_noise: 0.3,
        pressure_response: 0.0,
        main_opacity: 0.3,
    },
    BrushPreset {
        name: "splatter",
        description: "Random dots around stroke (good for effects)",
        base_width: 5.0,
        bristle_count: 10,
        bristle_spread: 2.0,
        bristle_width_ratio: 0.2,
        bristle_opacity: 0.6,
        edge_noise: 0.8,
        pressure_response: 0.3,
        main_opacity: 0.8,
    },
];

/// Look up a preset by name.
pub fn brush_preset(name: &str) -> Option<&'static BrushPreset> {
    BRUSH_PRESETS.iter().find(|p| p.name == name)
}

/// All preset names, in registry order.
pub fn brush_names() -> Vec<&'static str> {
    BRUSH_PRESETS.iter().map(|p| p.name).collect()
}

/// Formatted preset listing for the agent system prompt.
pub fn brush_descriptions() -> String {
    let mut lines = vec!["Available brushes:".to_string()];
    for preset in BRUSH_PRESETS {
        lines.push(format!("  - {}: {}", preset.name, preset.description));
    }
    lines.join("\n")
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_twelve_presets() {
        assert_eq!(BRUSH_PRESETS.len(), 12);
    }

    #[test]
    fn names_are_unique() {
        let mut names = brush_names();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), BRUSH_PRESETS.len());
    }

    #[test]
    fn oil_round_has_four_bristles() {
        assert_eq!(brush_preset("oil_round").unwrap().bristle_count, 4);
    }

    #[test]
    fn pencil_has_no_bristles() {
        assert_eq!(brush_preset("pencil").unwrap().bristle_count, 0);
    }

    #[test]
    fn unknown_name_returns_none() {
        assert!(brush_preset("crayon").is_none());
    }

    #[test]
    fn preset_values_are_sane() {
        for preset in BRUSH_PRESETS {
            assert!(preset.base_width > 0.0, "{}", preset.name);
            assert!(preset.bristle_count <= 50, "{}", preset.name);
            assert!((0.0..=1.0).contains(&preset.edge_noise), "{}", preset.name);
            assert!(
                (0.0..=1.0).contains(&preset.pressure_response),
                "{}",
                preset.name
            );
            assert!((0.0..=1.0).contains(&preset.main_opacity), "{}", preset.name);
        }
    }

    #[test]
    fn descriptions_mention_every_brush() {
        let text = brush_descriptions();
        assert!(text.starts_with("Available brushes:"));
        for preset in BRUSH_PRESETS {
            assert!(text.contains(preset.name));
        }
    }
}
