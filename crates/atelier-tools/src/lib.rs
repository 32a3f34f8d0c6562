// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The fixed tool set the artist agent may call, plus the registry that
//! dispatches to it.
//!
//! Tools receive an explicit [`ToolContext`] — the workspace store, canvas
//! dimensions, the orchestrator's draw hook, and sandbox/provider settings.
//! There is no process-wide tool state: two workspaces never share a
//! context.

pub mod builtin;
pub mod context;
pub mod provider;
pub mod registry;
pub mod sandbox;
pub mod tool;

pub use context::{DrawHook, ImageProvider, SandboxSettings, ToolContext};
pub use provider::HttpImageProvider;
pub use registry::{ToolRegistry, ToolSchema};
pub use tool::{Tool, ToolCall, ToolOutput, ToolOutputPart};

pub use builtin::draw_paths::DrawPathsTool;
pub use builtin::generate_svg::GenerateSvgTool;
pub use builtin::imagine::ImagineTool;
pub use builtin::mark_piece_done::MarkPieceDoneTool;
pub use builtin::name_piece::NamePieceTool;
pub use builtin::sign_canvas::SignCanvasTool;
pub use builtin::view_canvas::ViewCanvasTool;

use std::sync::Arc;

/// Registry with the full drawing tool set registered.
pub fn drawing_registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(DrawPathsTool);
    registry.register(GenerateSvgTool);
    registry.register(ViewCanvasTool);
    registry.register(ImagineTool);
    registry.register(SignCanvasTool);
    registry.register(NamePieceTool);
    registry.register(MarkPieceDoneTool);
    Arc::new(registry)
}
