// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Client message dispatch.
//!
//! One validated [`ClientMessage`] in, one workspace operation out, plus
//! the consequential broadcasts and orchestrator wake-ups.  A handler
//! failure is reported to the offending connection only; it never tears
//! down the dispatcher or the workspace.

use tracing::{info, warn};

use atelier_types::{
    style_config, AgentStatus, Author, ClientMessage, Path, PauseReason, Point, ServerMessage,
};

use crate::connections::ConnectionId;
use crate::ratelimit::StrokeLimiter;
use crate::registry::ActiveWorkspace;

pub struct Dispatcher {
    stroke_limiter: StrokeLimiter,
}

impl Dispatcher {
    pub fn new(max_strokes_per_minute: u32) -> Self {
        Self {
            stroke_limiter: StrokeLimiter::per_minute(max_strokes_per_minute),
        }
    }

    /// Route one message.  Errors bubble to the node, which answers the
    /// offending connection with an `error` message.
    pub async fn handle(
        &self,
        ws: &ActiveWorkspace,
        conn: ConnectionId,
        message: ClientMessage,
    ) -> anyhow::Result<()> {
        match message {
            ClientMessage::Stroke { points } => self.handle_stroke(ws, conn, points).await,
            ClientMessage::Nudge { text } => self.handle_nudge(ws, text).await,
            ClientMessage::Clear => self.handle_clear(ws).await,
            ClientMessage::NewCanvas {
                direction,
                drawing_style,
            } => self.handle_new_canvas(ws, direction, drawing_style).await,
            ClientMessage::LoadCanvas { canvas_id } => {
                self.handle_load_canvas(ws, conn, canvas_id).await
            }
            ClientMessage::Pause => self.handle_pause(ws).await,
            ClientMessage::Resume { direction } => self.handle_resume(ws, direction).await,
            ClientMessage::SetStyle { drawing_style } => {
                self.handle_set_style(ws, drawing_style).await
            }
        }
    }

    async fn handle_stroke(
        &self,
        ws: &ActiveWorkspace,
        conn: ConnectionId,
        points: Vec<Point>,
    ) -> anyhow::Result<()> {
        if !self.stroke_limiter.check(&ws.user_id) {
            warn!(user = %ws.user_id, "stroke rate limited");
            ws.connections.send_to(
                conn,
                &ServerMessage::Error {
                    message: "Drawing too fast. Please slow down.".to_string(),
                    details: None,
                },
            );
            return Ok(());
        }

        if points.is_empty() {
            return Ok(());
        }
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            anyhow::bail!("stroke contains non-finite coordinates");
        }

        let snapshot = ws.store.snapshot().await;
        let (width, height) = (snapshot.canvas.width as f64, snapshot.canvas.height as f64);
        let path = Path {
            author: Author::Human,
            ..Path::polyline(points.iter().map(|p| p.clamped(width, height)).collect())
        };

        ws.store.add_stroke(path.clone()).await?;
        ws.connections
            .broadcast(&ServerMessage::StrokeComplete { path });
        Ok(())
    }

    async fn handle_nudge(&self, ws: &ActiveWorkspace, text: String) -> anyhow::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        info!(user = %ws.user_id, nudge = %text, "nudge received");
        ws.orchestrator.add_nudge(text).await;
        ws.orchestrator.wake();
        Ok(())
    }

    /// Clear is new-canvas minus gallery persistence: abort the in-flight
    /// turn, drop pending batches, empty the canvas.
    async fn handle_clear(&self, ws: &ActiveWorkspace) -> anyhow::Result<()> {
        ws.orchestrator.set_abort();
        ws.store.clear_canvas().await?;
        ws.store.clear_pending().await?;
        ws.connections.broadcast(&ServerMessage::Clear);
        info!(user = %ws.user_id, "canvas cleared");
        Ok(())
    }

    async fn handle_new_canvas(
        &self,
        ws: &ActiveWorkspace,
        direction: Option<String>,
        drawing_style: Option<atelier_types::DrawingStyle>,
    ) -> anyhow::Result<()> {
        // Abort before the state flip so a late batch from the old turn is
        // discarded rather than queued against the new piece.
        ws.orchestrator.reset_session().await;

        let saved_id = ws.store.new_canvas().await?;

        if let Some(style) = drawing_style {
            if style != ws.store.drawing_style().await {
                ws.store.set_style(style).await?;
                ws.connections.broadcast(&ServerMessage::StyleChange {
                    drawing_style: style,
                    style_config: style_config(style),
                });
            }
        }

        if let Some(direction) = direction.filter(|d| !d.is_empty()) {
            info!(user = %ws.user_id, direction = %direction, "new canvas with direction");
            ws.orchestrator.add_nudge(direction).await;
        }

        ws.connections
            .broadcast(&ServerMessage::NewCanvas { saved_id: saved_id.clone() });
        let canvases = ws.store.list_gallery().await?;
        ws.connections
            .broadcast(&ServerMessage::GalleryUpdate { canvases });
        ws.connections.broadcast(&ServerMessage::PieceState {
            number: ws.store.piece_number().await,
            completed: false,
        });

        // Auto-start the agent on the fresh canvas.
        ws.store
            .set_pause(AgentStatus::Idle, PauseReason::None)
            .await?;
        ws.connections.broadcast(&ServerMessage::Status {
            status: AgentStatus::Idle,
        });
        ws.connections.broadcast(&ServerMessage::Paused {
            paused: false,
            reason: None,
        });
        ws.orchestrator.clear_piece_completed();
        ws.orchestrator.wake();

        info!(user = %ws.user_id, ?saved_id, "new canvas started");
        Ok(())
    }

    async fn handle_load_canvas(
        &self,
        ws: &ActiveWorkspace,
        conn: ConnectionId,
        canvas_id: String,
    ) -> anyhow::Result<()> {
        let piece_number = canvas_id
            .strip_prefix("piece_")
            .and_then(|n| n.parse::<u32>().ok());

        if let Some(piece_number) = piece_number {
            if let Some((strokes, drawing_style)) = ws.store.load_from_gallery(piece_number).await?
            {
                ws.store.replace_strokes(strokes.clone()).await?;
                ws.connections.broadcast(&ServerMessage::LoadCanvas {
                    strokes,
                    piece_number,
                    drawing_style,
                    style_config: style_config(drawing_style),
                });
                info!(user = %ws.user_id, piece = piece_number, "canvas loaded from gallery");
                return Ok(());
            }
        }

        warn!(user = %ws.user_id, canvas_id = %canvas_id, "canvas not found");
        ws.connections.send_to(
            conn,
            &ServerMessage::Error {
                message: format!("Canvas not found: {canvas_id}"),
                details: None,
            },
        );
        Ok(())
    }

    async fn handle_pause(&self, ws: &ActiveWorkspace) -> anyhow::Result<()> {
        ws.store
            .set_pause(AgentStatus::Paused, PauseReason::User)
            .await?;
        ws.connections.broadcast(&ServerMessage::Status {
            status: AgentStatus::Paused,
        });
        ws.connections.broadcast(&ServerMessage::Paused {
            paused: true,
            reason: Some(PauseReason::User),
        });
        info!(user = %ws.user_id, "agent paused by user");
        Ok(())
    }

    async fn handle_resume(
        &self,
        ws: &ActiveWorkspace,
        direction: Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(direction) = direction.filter(|d| !d.is_empty()) {
            ws.orchestrator.add_nudge(direction).await;
        }

        ws.store
            .set_pause(AgentStatus::Idle, PauseReason::None)
            .await?;
        ws.connections.broadcast(&ServerMessage::Status {
            status: AgentStatus::Idle,
        });
        ws.connections.broadcast(&ServerMessage::Paused {
            paused: false,
            reason: None,
        });
        ws.orchestrator.wake();
        info!(user = %ws.user_id, "agent resumed");
        Ok(())
    }

    async fn handle_set_style(
        &self,
        ws: &ActiveWorkspace,
        drawing_style: atelier_types::DrawingStyle,
    ) -> anyhow::Result<()> {
        if ws.store.drawing_style().await == drawing_style {
            // Idempotent: repeating the active style broadcasts nothing.
            return Ok(());
        }

        ws.store.set_style(drawing_style).await?;
        // The system prompt depends on the style; reconnect next turn.
        ws.orchestrator.reset_session().await;
        ws.connections.broadcast(&ServerMessage::StyleChange {
            drawing_style,
            style_config: style_config(drawing_style),
        });
        info!(user = %ws.user_id, style = ?drawing_style, "drawing style changed");
        Ok(())
    }
}
