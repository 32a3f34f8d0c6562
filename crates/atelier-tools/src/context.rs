// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Explicit per-workspace context threaded through every tool call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use atelier_render::{png_data_url, render_canvas_png};
use atelier_state::WorkspaceStore;
use atelier_types::{style_config, Path};

/// Sink for drawn paths, registered by the orchestrator at activation.
///
/// Drawing tools call this exactly once per invocation after adding their
/// strokes to the canvas.  The orchestrator's implementation queues the
/// batch, notifies clients, and holds the turn for the animation duration
/// (the draw-gate).  `done = true` signals piece completion.
#[async_trait]
pub trait DrawHook: Send + Sync {
    async fn draw(&self, paths: Vec<Path>, done: bool);
}

/// External image-generation provider behind the `imagine` tool.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate an image for the prompt; returns PNG bytes.
    async fn generate(&self, prompt: &str) -> anyhow::Result<Vec<u8>>;
}

/// Sub-interpreter settings for `generate_svg`.
#[derive(Debug, Clone)]
pub struct SandboxSettings {
    pub python_bin: String,
    pub timeout: Duration,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            python_bin: "python3".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Everything a tool may touch.  One context per workspace; no globals.
pub struct ToolContext {
    pub store: Arc<WorkspaceStore>,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub draw: Arc<dyn DrawHook>,
    pub image_provider: Option<Arc<dyn ImageProvider>>,
    pub image_timeout: Duration,
    pub sandbox: SandboxSettings,
}

impl ToolContext {
    /// Render the current canvas to a PNG data URL (off the async thread).
    ///
    /// Human strokes are highlighted so the agent can tell collaborative
    /// marks from its own.
    pub async fn snapshot_data_url(&self) -> anyhow::Result<String> {
        let snapshot = self.store.snapshot().await;
        let config = style_config(snapshot.canvas.drawing_style);
        let png = tokio::task::spawn_blocking(move || {
            render_canvas_png(&snapshot.canvas, &config, true)
        })
        .await??;
        Ok(png_data_url(&png))
    }
}

// ─── Test support ─────────────────────────────────────────────────────────────

/// Draw hook that records calls; shared by the tool and orchestrator tests.
#[derive(Default)]
pub struct RecordingDrawHook {
    pub calls: tokio::sync::Mutex<Vec<(Vec<Path>, bool)>>,
}

#[async_trait]
impl DrawHook for RecordingDrawHook {
    async fn draw(&self, paths: Vec<Path>, done: bool) {
        self.calls.lock().await.push((paths, done));
    }
}
