// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the HTTP/WebSocket node.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Static bearer-token table for the development validator: token → user
    /// UUID.  Production deployments plug a real validator into the node and
    /// leave this empty.
    #[serde(default)]
    pub dev_tokens: HashMap<String, String>,
    /// User ids whose galleries appear in the unauthenticated public routes.
    ///
    /// ```yaml
    /// server:
    ///   public_gallery_users:
    ///     - 6a1f0a4e-9d0e-4bbb-a8a1-1d20f2a0c9ee
    /// ```
    #[serde(default)]
    pub public_gallery_users: Vec<String>,
    /// External base URL used when rendering sitemap entries.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Maximum seconds to wait for WebSocket connections to close on
    /// shutdown.
    #[serde(default = "default_drain_timeout_s")]
    pub drain_timeout_s: f64,
    /// Maximum seconds to wait for background tasks to stop on shutdown.
    #[serde(default = "default_shutdown_timeout_s")]
    pub shutdown_timeout_s: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            dev_tokens: HashMap::new(),
            public_gallery_users: Vec::new(),
            public_base_url: default_public_base_url(),
            drain_timeout_s: default_drain_timeout_s(),
            shutdown_timeout_s: default_shutdown_timeout_s(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Base directory for per-user state.  Each user gets
    /// `<root>/<user_id>/` with `workspace.json`, `gallery/` and
    /// `references/`.
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
    /// Serialized-size cap for `workspace.json`.  When exceeded, the oldest
    /// canvas strokes are trimmed ten at a time until the file fits.
    #[serde(default = "default_max_workspace_bytes")]
    pub max_workspace_bytes: usize,
    /// Grace period before an idle workspace (no connections) is
    /// deactivated.
    #[serde(default = "default_idle_grace_period_s")]
    pub idle_grace_period_s: u64,
    /// Debounce window for coalescing rapid saves.
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
            max_workspace_bytes: default_max_workspace_bytes(),
            idle_grace_period_s: default_idle_grace_period_s(),
            save_debounce_ms: default_save_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_width")]
    pub width: u32,
    #[serde(default = "default_canvas_height")]
    pub height: u32,
    /// Interpolation density: animation steps per unit of path length.
    #[serde(default = "default_path_steps_per_unit")]
    pub path_steps_per_unit: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_canvas_width(),
            height: default_canvas_height(),
            path_steps_per_unit: default_path_steps_per_unit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Safety-net wake interval for the orchestrator loop.  The loop normally
    /// wakes on events (connect, resume, nudge); this bounds the sleep.
    #[serde(default = "default_agent_interval_s")]
    pub interval_s: u64,
    /// Client animation frame rate used to size the draw-gate wait.
    #[serde(default = "default_client_fps")]
    pub client_fps: f64,
    /// Extra wait added to the draw-gate for network latency.
    #[serde(default = "default_animation_wait_buffer_ms")]
    pub animation_wait_buffer_ms: u64,
    /// Upper bound on a single draw-gate wait.
    #[serde(default = "default_max_animation_wait_s")]
    pub max_animation_wait_s: f64,
    /// Truncation caps for stdout/stderr in `code_execution` broadcasts.
    #[serde(default = "default_max_stdout_chars")]
    pub max_stdout_chars: usize,
    #[serde(default = "default_max_stderr_chars")]
    pub max_stderr_chars: usize,
    /// Wall-clock limit for one external image generation call.
    #[serde(default = "default_image_gen_timeout_s")]
    pub image_gen_timeout_s: u64,
    /// Endpoint of the external image-generation provider.  `None` disables
    /// the `imagine` tool.
    #[serde(default)]
    pub image_endpoint: Option<String>,
    /// Environment variable holding the image provider API key (read at
    /// runtime; never stored in config files).
    #[serde(default)]
    pub image_api_key_env: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval_s: default_agent_interval_s(),
            client_fps: default_client_fps(),
            animation_wait_buffer_ms: default_animation_wait_buffer_ms(),
            max_animation_wait_s: default_max_animation_wait_s(),
            max_stdout_chars: default_max_stdout_chars(),
            max_stderr_chars: default_max_stderr_chars(),
            image_gen_timeout_s: default_image_gen_timeout_s(),
            image_endpoint: None,
            image_api_key_env: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Cap on queued pending strokes per workspace.  When full, the oldest
    /// entries are dropped to make room for a new batch.
    #[serde(default = "default_max_pending_strokes")]
    pub max_pending_strokes: usize,
    /// Per-user WebSocket connection cap.  0 = unlimited.
    #[serde(default)]
    pub max_connections_per_user: usize,
    /// Token-bucket rate limit for human strokes.
    #[serde(default = "default_max_strokes_per_minute")]
    pub max_strokes_per_minute: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_pending_strokes: default_max_pending_strokes(),
            max_connections_per_user: 0,
            max_strokes_per_minute: default_max_strokes_per_minute(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Wall-clock limit for one `generate_svg` sub-interpreter run.  The
    /// process is killed on expiry.
    #[serde(default = "default_python_timeout_s")]
    pub python_timeout_s: u64,
    /// Interpreter binary.
    #[serde(default = "default_python_bin")]
    pub python_bin: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            python_timeout_s: default_python_timeout_s(),
            python_bin: default_python_bin(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8700".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8700".to_string()
}

fn default_drain_timeout_s() -> f64 {
    5.0
}

fn default_shutdown_timeout_s() -> f64 {
    10.0
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from("var/workspaces")
}

fn default_max_workspace_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_idle_grace_period_s() -> u64 {
    300
}

fn default_save_debounce_ms() -> u64 {
    500
}

fn default_canvas_width() -> u32 {
    800
}

fn default_canvas_height() -> u32 {
    600
}

fn default_path_steps_per_unit() -> f64 {
    0.5
}

fn default_agent_interval_s() -> u64 {
    30
}

fn default_client_fps() -> f64 {
    60.0
}

fn default_animation_wait_buffer_ms() -> u64 {
    500
}

fn default_max_animation_wait_s() -> f64 {
    20.0
}

fn default_max_stdout_chars() -> usize {
    2000
}

fn default_max_stderr_chars() -> usize {
    1000
}

fn default_image_gen_timeout_s() -> u64 {
    60
}

fn default_max_pending_strokes() -> usize {
    1000
}

fn default_max_strokes_per_minute() -> u32 {
    60
}

fn default_python_timeout_s() -> u64 {
    30
}

fn default_python_bin() -> String {
    "python3".to_string()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
