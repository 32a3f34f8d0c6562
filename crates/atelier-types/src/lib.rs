// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Shared data model for the atelier server.
//!
//! Everything here is plain serde data: geometry, drawable paths, brush
//! presets, drawing styles, per-workspace state records, and the WebSocket
//! wire messages.  No I/O, no async — the behavioural crates build on top.

pub mod brush;
pub mod geometry;
pub mod message;
pub mod path;
pub mod state;
pub mod style;

pub use brush::{brush_descriptions, brush_names, brush_preset, BrushPreset, BRUSH_PRESETS};
pub use geometry::{clamp, Point};
pub use message::{ClientMessage, ExecutionPhase, ServerMessage};
pub use path::{Author, Path, PathKind};
pub use state::{
    piece_id, AgentStatus, CanvasState, GalleryEntry, PauseReason, PendingStroke, SavedPiece,
};
pub use style::{style_config, DrawingStyle, StrokeStyle, StyleConfig};
