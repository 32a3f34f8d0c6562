// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Per-workspace state records.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::path::Path;
use crate::style::DrawingStyle;

/// Agent status as shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Thinking,
    /// Running code in the sandbox.
    Executing,
    Drawing,
    #[default]
    Paused,
    Error,
}

/// Why the agent is paused.  Distinguishes user intent from the automatic
/// pause on last disconnect, so a reconnect only auto-resumes the latter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseReason {
    #[default]
    None,
    User,
    Disconnect,
}

fn default_canvas_width() -> u32 {
    800
}

fn default_canvas_height() -> u32 {
    600
}

/// The live canvas: ordered strokes plus the active drawing style.
/// Insertion order is the only ordering; a stroke's index is its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasState {
    #[serde(default = "default_canvas_width")]
    pub width: u32,
    #[serde(default = "default_canvas_height")]
    pub height: u32,
    #[serde(default)]
    pub strokes: Vec<Path>,
    #[serde(default)]
    pub drawing_style: DrawingStyle,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            width: default_canvas_width(),
            height: default_canvas_height(),
            strokes: Vec::new(),
            drawing_style: DrawingStyle::default(),
        }
    }
}

impl CanvasState {
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

/// One interpolated stroke waiting to be fetched by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingStroke {
    pub batch_id: u64,
    pub path: Path,
    pub points: Vec<Point>,
}

/// Gallery listing entry — metadata only, no stroke data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub id: String,
    pub piece_number: u32,
    pub stroke_count: usize,
    pub created_at: String,
    #[serde(default)]
    pub drawing_style: DrawingStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A finished piece as stored on disk: a standalone immutable record
/// carrying its full stroke list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPiece {
    pub piece_number: u32,
    #[serde(default)]
    pub strokes: Vec<Path>,
    pub created_at: String,
    #[serde(default)]
    pub drawing_style: DrawingStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Canonical gallery piece id: `piece_` + zero-padded piece number.
pub fn piece_id(piece_number: u32) -> String {
    format!("piece_{piece_number:06}")
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
