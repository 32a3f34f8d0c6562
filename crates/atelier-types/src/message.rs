// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//!
//! Wire protocol between clients and the workspace node.
//!
//! All messages are JSON text frames over WebSocket, discriminated by a
//! `type` field.
//!
//! # Typical session flow
//!
//! ```text
//! Client                              Node / Orchestrator
//!    │                                   │
//!    │◄─ Init {strokes, gallery, …} ─────│  on connect
//!    │                                   │
//!    │── Nudge {text} ──────────────────►│  orchestrator wakes
//!    │◄─ Status {thinking} ──────────────│
//!    │◄─ ThinkingDelta {text} × N ───────│
//!    │◄─ CodeExecution {started} ────────│  tool call begins
//!    │◄─ AgentStrokesReady {batch_id} ───│  fetch via GET /strokes/pending
//!    │◄─ CodeExecution {completed} ──────│
//!    │◄─ PieceState {completed: true} ───│  when the agent marks done
//!    │                                   │
//!    │── NewCanvas {direction?} ────────►│  gallery updated, loop re-armed
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geometry::Point;
use crate::path::Path;
use crate::state::{AgentStatus, GalleryEntry, PauseReason};
use crate::style::{DrawingStyle, StyleConfig};

/// Lifecycle phase of a broadcast tool execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPhase {
    Started,
    Completed,
}

// ── Server → client messages ──────────────────────────────────────────────────

/// Messages broadcast (or unicast) to a user's connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full workspace snapshot, sent once per connection.
    Init {
        strokes: Vec<Path>,
        gallery: Vec<GalleryEntry>,
        status: AgentStatus,
        paused: bool,
        piece_number: u32,
        monologue: String,
        drawing_style: DrawingStyle,
        style_config: StyleConfig,
    },

    Paused {
        paused: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<PauseReason>,
    },

    Status {
        status: AgentStatus,
    },

    /// Echo of an accepted human stroke.
    StrokeComplete {
        path: Path,
    },

    Clear,

    /// New canvas began; `saved_id` names the gallery record of the previous
    /// canvas, `None` when it was empty.
    NewCanvas {
        #[serde(skip_serializing_if = "Option::is_none")]
        saved_id: Option<String>,
    },

    GalleryUpdate {
        canvases: Vec<GalleryEntry>,
    },

    PieceState {
        number: u32,
        completed: bool,
    },

    /// Incremental agent text (delta only, not accumulated).
    ThinkingDelta {
        text: String,
        iteration: u32,
    },

    /// A tool call started or completed.
    CodeExecution {
        status: ExecutionPhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_input: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stdout: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        return_code: Option<i32>,
        iteration: u32,
    },

    /// A stroke batch is queued; the client fetches it via REST.
    /// `piece_number` prevents rendering a late batch onto a new canvas.
    AgentStrokesReady {
        count: usize,
        batch_id: u64,
        piece_number: u32,
    },

    Iteration {
        current: u32,
        max: u32,
    },

    StyleChange {
        drawing_style: DrawingStyle,
        style_config: StyleConfig,
    },

    /// A gallery piece loaded into the current canvas.
    LoadCanvas {
        strokes: Vec<Path>,
        piece_number: u32,
        drawing_style: DrawingStyle,
        style_config: StyleConfig,
    },

    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

// ── Client → server messages ──────────────────────────────────────────────────

/// Messages a client may send.  Unknown `type` values fail to parse and are
/// answered with a [`ServerMessage::Error`]; the connection stays open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A human-drawn stroke (raw points; becomes a polyline).
    Stroke {
        points: Vec<Point>,
    },

    /// Short free-text suggestion for the agent's next turn.
    Nudge {
        text: String,
    },

    Clear,

    NewCanvas {
        #[serde(default)]
        direction: Option<String>,
        #[serde(default)]
        drawing_style: Option<DrawingStyle>,
    },

    LoadCanvas {
        canvas_id: String,
    },

    Pause,

    Resume {
        #[serde(default)]
        direction: Option<String>,
    },

    SetStyle {
        drawing_style: DrawingStyle,
    },
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_message_carries_type_tag() {
        let msg = ServerMessage::Clear;
        assert_eq!(serde_json::to_value(&msg).unwrap(), json!({"type": "clear"}));
    }

    #[test]
    fn agent_strokes_ready_shape() {
        let msg = ServerMessage::AgentStrokesReady {
            count: 5,
            batch_id: 7,
            piece_number: 2,
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["type"], "agent_strokes_ready");
        assert_eq!(v["batch_id"], 7);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let msg = ServerMessage::NewCanvas { saved_id: None };
        let v = serde_json::to_value(&msg).unwrap();
        assert!(v.get("saved_id").is_none());
    }

    #[test]
    fn client_stroke_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"stroke","points":[{"x":1,"y":2}]}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Stroke { points } if points.len() == 1));
    }

    #[test]
    fn client_new_canvas_fields_are_optional() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"new_canvas"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::NewCanvas {
                direction: None,
                drawing_style: None
            }
        ));
    }

    #[test]
    fn unknown_client_type_fails_to_parse() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"reboot"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn paused_reason_serializes_lowercase() {
        let msg = ServerMessage::Paused {
            paused: true,
            reason: Some(PauseReason::Disconnect),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["reason"], "disconnect");
    }
}
