// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! On-disk document format for `workspace.json`.
//!
//! Every field is optional on read: workspaces written by older builds (or
//! hand-edited) load with documented defaults instead of being quarantined.
//! Only structurally invalid JSON counts as corrupt.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use atelier_types::{AgentStatus, CanvasState, PauseReason, PendingStroke};

/// The serialized form of a workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    #[serde(default)]
    pub canvas: CanvasState,
    #[serde(default, deserialize_with = "lenient")]
    pub status: AgentStatus,
    #[serde(default, deserialize_with = "lenient")]
    pub pause_reason: PauseReason,
    #[serde(default = "default_piece_number")]
    pub piece_number: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub monologue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_piece_title: Option<String>,
    #[serde(default)]
    pub pending_strokes: Vec<PendingStroke>,
    #[serde(default)]
    pub stroke_batch_id: u64,
    #[serde(default)]
    pub updated_at: String,
}

/// Piece numbering is 1-based: the gallery holds pieces `1..piece_number`.
fn default_piece_number() -> u32 {
    1
}

/// Deserialize a value, falling back to its default on an unrecognized
/// variant instead of failing the whole document.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gets_defaults() {
        let doc: WorkspaceDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(doc.piece_number, 1);
        assert_eq!(doc.status, AgentStatus::Paused);
        assert_eq!(doc.pause_reason, PauseReason::None);
        assert_eq!(doc.stroke_batch_id, 0);
        assert!(doc.pending_strokes.is_empty());
    }

    #[test]
    fn invalid_pause_reason_defaults_to_none() {
        let doc: WorkspaceDocument =
            serde_json::from_str(r#"{"pause_reason": "invalid_value"}"#).unwrap();
        assert_eq!(doc.pause_reason, PauseReason::None);
    }

    #[test]
    fn invalid_status_defaults_to_paused() {
        let doc: WorkspaceDocument = serde_json::from_str(r#"{"status": "meditating"}"#).unwrap();
        assert_eq!(doc.status, AgentStatus::Paused);
    }

    #[test]
    fn valid_fields_are_preserved() {
        let doc: WorkspaceDocument = serde_json::from_str(
            r#"{"status": "idle", "pause_reason": "disconnect", "piece_number": 7}"#,
        )
        .unwrap();
        assert_eq!(doc.status, AgentStatus::Idle);
        assert_eq!(doc.pause_reason, PauseReason::Disconnect);
        assert_eq!(doc.piece_number, 7);
    }
}
