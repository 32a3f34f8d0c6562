// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The per-user agent control loop.
//!
//! The loop is event-driven: it wakes on [`Orchestrator::wake`] (connect,
//! resume, nudge) with a configured interval as a safety net, and runs a
//! turn only when connections exist, the agent is not paused, and the
//! piece-completed latch is clear.
//!
//! Drawing tools reach back through a [`DrawHook`] registered in the tool
//! context: it queues the batch, notifies clients, and then sleeps for the
//! batch's animation duration — the *draw-gate* that keeps the agent from
//! outrunning the client and bounds the pending queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

use atelier_config::AgentConfig;
use atelier_render::{png_base64, render_canvas_png};
use atelier_session::{AgentSession, SessionEvent, SessionOptions, TurnPrompt};
use atelier_state::WorkspaceStore;
use atelier_strokes::expand;
use atelier_tools::{
    DrawHook, ImageProvider, SandboxSettings, ToolContext, ToolRegistry,
};
use atelier_types::{
    style_config, AgentStatus, ExecutionPhase, Path, ServerMessage,
};

use crate::connections::ConnectionSet;

/// Loop and draw-gate tunables.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub agent_interval: Duration,
    pub client_fps: f64,
    pub animation_wait_buffer: Duration,
    pub max_animation_wait: Duration,
    pub max_stdout_chars: usize,
    pub max_stderr_chars: usize,
}

impl OrchestratorConfig {
    pub fn from_agent_config(cfg: &AgentConfig) -> Self {
        Self {
            agent_interval: Duration::from_secs(cfg.interval_s),
            client_fps: cfg.client_fps,
            animation_wait_buffer: Duration::from_millis(cfg.animation_wait_buffer_ms),
            max_animation_wait: Duration::from_secs_f64(cfg.max_animation_wait_s),
            max_stdout_chars: cfg.max_stdout_chars,
            max_stderr_chars: cfg.max_stderr_chars,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from_agent_config(&AgentConfig::default())
    }
}

/// External collaborators and canvas geometry injected into the tool
/// context.
pub struct ToolDeps {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub image_provider: Option<Arc<dyn ImageProvider>>,
    pub image_timeout: Duration,
    pub sandbox: SandboxSettings,
}

impl Default for ToolDeps {
    fn default() -> Self {
        Self {
            canvas_width: 800,
            canvas_height: 600,
            image_provider: None,
            image_timeout: Duration::from_secs(60),
            sandbox: SandboxSettings::default(),
        }
    }
}

/// Draw hook implementation carrying the draw-gate.
struct GateDrawHook {
    store: Arc<WorkspaceStore>,
    connections: Arc<ConnectionSet>,
    abort: Arc<AtomicBool>,
    piece_done: Arc<AtomicBool>,
    cfg: OrchestratorConfig,
}

#[async_trait]
impl DrawHook for GateDrawHook {
    async fn draw(&self, paths: Vec<Path>, done: bool) {
        if done {
            self.piece_done.store(true, Ordering::SeqCst);
        }
        if paths.is_empty() {
            return;
        }
        // A clear/new_canvas mid-turn sets the abort flag before clearing
        // the queue; a late batch from that turn must not be queued.
        if self.abort.load(Ordering::SeqCst) {
            debug!(user = %self.connections.user_id(), "discarding batch from aborted turn");
            return;
        }

        let snapshot = self.store.snapshot().await;
        let style = snapshot.canvas.drawing_style;
        let (width, height) = (snapshot.canvas.width as f64, snapshot.canvas.height as f64);
        let expanded: Vec<Path> = paths
            .iter()
            .flat_map(|p| expand(p, style, width, height))
            .collect();

        let (batch_id, total_points) = match self.store.queue_strokes(&expanded).await {
            Ok(result) => result,
            Err(e) => {
                warn!(user = %self.connections.user_id(), "failed to queue strokes: {e}");
                return;
            }
        };

        self.connections.broadcast(&ServerMessage::AgentStrokesReady {
            count: paths.len(),
            batch_id,
            piece_number: snapshot.piece_number,
        });

        if self.store.set_status(AgentStatus::Drawing).await.is_ok() {
            self.connections.broadcast(&ServerMessage::Status {
                status: AgentStatus::Drawing,
            });
        }

        // The draw-gate: hold the turn while the client animates.
        let animation = Duration::from_secs_f64(total_points as f64 / self.cfg.client_fps)
            + self.cfg.animation_wait_buffer;
        let wait = animation.min(self.cfg.max_animation_wait);
        info!(
            user = %self.connections.user_id(),
            batch_id,
            total_points,
            wait_ms = wait.as_millis() as u64,
            "waiting for client animation"
        );
        tokio::time::sleep(wait).await;

        // Back to thinking — unless a pause landed during the gate.
        if self.store.status().await == AgentStatus::Drawing {
            let _ = self.store.set_status(AgentStatus::Thinking).await;
            self.connections.broadcast(&ServerMessage::Status {
                status: AgentStatus::Thinking,
            });
        }
    }
}

/// Orchestrates agent turns for one workspace.
pub struct Orchestrator {
    store: Arc<WorkspaceStore>,
    connections: Arc<ConnectionSet>,
    session: Arc<dyn AgentSession>,
    registry: Arc<ToolRegistry>,
    context: Arc<ToolContext>,
    cfg: OrchestratorConfig,
    wake: Notify,
    piece_completed: AtomicBool,
    abort: Arc<AtomicBool>,
    piece_done: Arc<AtomicBool>,
    nudges: Mutex<Vec<String>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<WorkspaceStore>,
        connections: Arc<ConnectionSet>,
        session: Arc<dyn AgentSession>,
        registry: Arc<ToolRegistry>,
        cfg: OrchestratorConfig,
        deps: ToolDeps,
    ) -> Arc<Self> {
        let abort = Arc::new(AtomicBool::new(false));
        let piece_done = Arc::new(AtomicBool::new(false));

        let hook = Arc::new(GateDrawHook {
            store: Arc::clone(&store),
            connections: Arc::clone(&connections),
            abort: Arc::clone(&abort),
            piece_done: Arc::clone(&piece_done),
            cfg: cfg.clone(),
        });

        let context = Arc::new(ToolContext {
            store: Arc::clone(&store),
            canvas_width: deps.canvas_width,
            canvas_height: deps.canvas_height,
            draw: hook,
            image_provider: deps.image_provider,
            image_timeout: deps.image_timeout,
            sandbox: deps.sandbox,
        });

        Arc::new(Self {
            store,
            connections,
            session,
            registry,
            context,
            cfg,
            wake: Notify::new(),
            piece_completed: AtomicBool::new(false),
            abort,
            piece_done,
            nudges: Mutex::new(Vec::new()),
        })
    }

    // ── Signals ───────────────────────────────────────────────────────────────

    /// Wake the loop immediately: new connection, resume, nudge.
    pub fn wake(&self) {
        debug!(user = %self.connections.user_id(), "orchestrator wake");
        self.wake.notify_one();
    }

    /// Abort the in-flight turn (clear / new canvas).  Batches arriving
    /// after this point are discarded.
    pub fn set_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    /// Queue a nudge for the next turn's prompt and clear the completion
    /// latch so the loop runs again.
    pub async fn add_nudge(&self, text: String) {
        self.nudges.lock().await.push(text);
        self.clear_piece_completed();
    }

    pub fn piece_completed(&self) -> bool {
        self.piece_completed.load(Ordering::SeqCst)
    }

    /// Allow new turns after a completed piece (new canvas, nudge).
    pub fn clear_piece_completed(&self) {
        self.piece_completed.store(false, Ordering::SeqCst);
    }

    /// Abort and drop the session; the next turn reconnects with a fresh
    /// system prompt.  Used on new canvas and style changes.
    pub async fn reset_session(&self) {
        self.set_abort();
        if let Err(e) = self.session.disconnect().await {
            warn!(user = %self.connections.user_id(), "session disconnect failed: {e}");
        }
    }

    // ── Loop ──────────────────────────────────────────────────────────────────

    /// Run until the owning task is aborted.
    pub async fn run_loop(self: Arc<Self>) {
        info!(user = %self.connections.user_id(), "agent loop started");
        loop {
            tokio::select! {
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(self.cfg.agent_interval) => {}
            }

            // Cost control: only work while someone is watching.
            if self.connections.is_empty() {
                debug!(user = %self.connections.user_id(), "skip: no active connections");
                continue;
            }
            if self.store.status().await == AgentStatus::Paused {
                debug!(user = %self.connections.user_id(), "skip: agent paused");
                continue;
            }
            if self.piece_completed() {
                debug!(user = %self.connections.user_id(), "skip: piece completed");
                continue;
            }

            if let Err(e) = self.run_turn().await {
                error!(user = %self.connections.user_id(), "agent turn failed: {e}");
                let _ = self.store.set_status(AgentStatus::Error).await;
                self.connections.broadcast(&ServerMessage::Error {
                    message: e.to_string(),
                    details: None,
                });
            }
        }
    }

    /// Run a single agent turn.  Returns true when the piece was completed.
    pub async fn run_turn(&self) -> anyhow::Result<bool> {
        info!(user = %self.connections.user_id(), "starting agent turn");
        self.abort.store(false, Ordering::SeqCst);
        self.piece_done.store(false, Ordering::SeqCst);

        if !self.session.is_connected() {
            self.connect_session().await?;
        }

        self.store.set_status(AgentStatus::Thinking).await?;
        self.connections.broadcast(&ServerMessage::Status {
            status: AgentStatus::Thinking,
        });
        self.connections
            .broadcast(&ServerMessage::Iteration { current: 1, max: 1 });

        let prompt_text = self.compose_prompt().await;
        let canvas_png = self.render_canvas().await?;

        let mut stream = self
            .session
            .query(TurnPrompt {
                text: prompt_text,
                canvas_png_base64: Some(canvas_png),
            })
            .await?;

        let mut thinking = String::new();
        while let Some(event) = stream.next().await {
            if self.abort.load(Ordering::SeqCst) {
                info!(user = %self.connections.user_id(), "turn aborted");
                break;
            }
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    // Provider failure: end the turn, keep the loop alive.
                    warn!(user = %self.connections.user_id(), "session stream error: {e}");
                    self.connections.broadcast(&ServerMessage::Error {
                        message: "agent stream failed".to_string(),
                        details: Some(e.to_string()),
                    });
                    break;
                }
            };
            match event {
                SessionEvent::TextDelta(text) => {
                    thinking.push_str(&text);
                    self.connections.broadcast(&ServerMessage::ThinkingDelta {
                        text,
                        iteration: 1,
                    });
                    // Keep the persisted monologue current without a full
                    // write per delta.
                    self.store.set_monologue_debounced(thinking.clone()).await;
                }
                SessionEvent::TextBlock(text) => {
                    debug!(chars = text.len(), "assistant block complete");
                }
                SessionEvent::ToolUse { name, args, .. } => {
                    info!(user = %self.connections.user_id(), tool = %name, "tool call started");
                    if name == "generate_svg" {
                        self.store.set_status(AgentStatus::Executing).await?;
                        self.connections.broadcast(&ServerMessage::Status {
                            status: AgentStatus::Executing,
                        });
                    }
                    self.connections.broadcast(&ServerMessage::CodeExecution {
                        status: ExecutionPhase::Started,
                        tool_name: Some(name),
                        tool_input: Some(args),
                        stdout: None,
                        stderr: None,
                        return_code: None,
                        iteration: 1,
                    });
                }
                SessionEvent::ToolResult {
                    tool_name,
                    content,
                    is_error,
                    ..
                } => {
                    let (stdout, stderr) = if is_error {
                        (None, Some(truncate(&content, self.cfg.max_stderr_chars)))
                    } else {
                        (Some(truncate(&content, self.cfg.max_stdout_chars)), None)
                    };
                    self.connections.broadcast(&ServerMessage::CodeExecution {
                        status: ExecutionPhase::Completed,
                        tool_name: Some(tool_name),
                        tool_input: None,
                        stdout,
                        stderr,
                        return_code: Some(if is_error { 1 } else { 0 }),
                        iteration: 1,
                    });
                    if self.store.status().await == AgentStatus::Executing {
                        self.store.set_status(AgentStatus::Thinking).await?;
                        self.connections.broadcast(&ServerMessage::Status {
                            status: AgentStatus::Thinking,
                        });
                    }
                }
                SessionEvent::System(note) => {
                    debug!(user = %self.connections.user_id(), "session: {note}");
                }
                SessionEvent::Error(message) => {
                    warn!(user = %self.connections.user_id(), "agent error: {message}");
                    self.connections.broadcast(&ServerMessage::Error {
                        message,
                        details: None,
                    });
                }
                SessionEvent::Done => break,
            }
        }

        let aborted = self.abort.load(Ordering::SeqCst);
        if !aborted {
            self.store.set_monologue(thinking).await?;
        }

        // Do not clobber a pause that landed mid-turn.
        if self.store.status().await != AgentStatus::Paused {
            self.store.set_status(AgentStatus::Idle).await?;
            self.connections.broadcast(&ServerMessage::Status {
                status: AgentStatus::Idle,
            });
        }

        let done = !aborted && self.piece_done.load(Ordering::SeqCst);
        if done {
            self.finalize_piece().await?;
        }
        Ok(done)
    }

    /// Persist the finished piece and latch the loop until the user acts.
    async fn finalize_piece(&self) -> anyhow::Result<()> {
        let piece_number = self.store.piece_number().await;
        info!(user = %self.connections.user_id(), piece = piece_number, "piece complete");

        self.connections.broadcast(&ServerMessage::PieceState {
            number: piece_number,
            completed: true,
        });

        let saved = self.store.save_to_gallery().await?;
        debug!(user = %self.connections.user_id(), ?saved, "gallery write");

        let canvases = self.store.list_gallery().await?;
        self.connections
            .broadcast(&ServerMessage::GalleryUpdate { canvases });

        self.piece_completed.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Compose the turn prompt; pending nudges are drained here.
    async fn compose_prompt(&self) -> String {
        let snapshot = self.store.snapshot().await;
        let mut parts = vec![format!(
            "Canvas size: {}x{}\nExisting strokes: {}\nPiece number: {}",
            snapshot.canvas.width,
            snapshot.canvas.height,
            snapshot.canvas.strokes.len(),
            snapshot.piece_number,
        )];

        if !snapshot.notes.is_empty() {
            parts.push(format!("Your notes:\n{}", snapshot.notes));
        }

        let nudges = std::mem::take(&mut *self.nudges.lock().await);
        if !nudges.is_empty() {
            let lines: Vec<String> = nudges.iter().map(|n| format!("- {n}")).collect();
            parts.push(format!("Human nudges:\n{}", lines.join("\n")));
        }

        parts.join("\n\n")
    }

    /// Render the canvas off the loop task and return base64 PNG.
    async fn render_canvas(&self) -> anyhow::Result<String> {
        let snapshot = self.store.snapshot().await;
        let config = style_config(snapshot.canvas.drawing_style);
        let png = tokio::task::spawn_blocking(move || {
            render_canvas_png(&snapshot.canvas, &config, true)
        })
        .await??;
        Ok(png_base64(&png))
    }

    /// Connect the session with a system prompt for the current style.
    pub async fn connect_session(&self) -> anyhow::Result<()> {
        let style = self.store.drawing_style().await;
        let options = SessionOptions {
            system_prompt: atelier_session::system_prompt(&style_config(style)),
            registry: Arc::clone(&self.registry),
            context: Arc::clone(&self.context),
            workspace_dir: Some(self.store.workspace_dir().to_path_buf()),
            partial_messages: true,
        };
        self.session.connect(options).await
    }

    pub fn connections(&self) -> &Arc<ConnectionSet> {
        &self.connections
    }

    /// The tool context handed to the session (drawing tools dispatch
    /// through it).
    pub fn tool_context(&self) -> &Arc<ToolContext> {
        &self.context
    }
}

fn truncate(text: &str, cap: usize) -> String {
    text.chars().take(cap).collect()
}
