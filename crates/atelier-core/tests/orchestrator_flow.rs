// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Orchestrator turn tests against a scripted session and real tools.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use atelier_core::{ConnectionSet, Orchestrator, OrchestratorConfig, ToolDeps};
use atelier_session::{ScriptStep, ScriptedSession};
use atelier_state::{StoreOptions, WorkspaceStore};
use atelier_tools::drawing_registry;
use atelier_types::DrawingStyle;

const USER: &str = "6a1f0a4e-9d0e-4bbb-a8a1-1d20f2a0c9ee";

/// Draw-gate sized for tests: waits stay in the low milliseconds.
fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        agent_interval: Duration::from_secs(3600),
        client_fps: 100_000.0,
        animation_wait_buffer: Duration::from_millis(1),
        max_animation_wait: Duration::from_millis(5),
        max_stdout_chars: 200,
        max_stderr_chars: 200,
    }
}

struct Rig {
    store: Arc<WorkspaceStore>,
    session: Arc<ScriptedSession>,
    orchestrator: Arc<Orchestrator>,
    rx: mpsc::UnboundedReceiver<String>,
}

async fn rig(dir: &std::path::Path, scripts: Vec<Vec<ScriptStep>>) -> Rig {
    let store = WorkspaceStore::load_for_user(USER, dir, StoreOptions::default())
        .await
        .unwrap();
    let connections = Arc::new(ConnectionSet::new(USER, 0));
    let (tx, rx) = mpsc::unbounded_channel();
    connections.add(tx).unwrap();

    let session = Arc::new(ScriptedSession::new(scripts));
    let orchestrator = Orchestrator::new(
        Arc::clone(&store),
        connections,
        session.clone(),
        drawing_registry(),
        test_config(),
        ToolDeps::default(),
    );
    Rig {
        store,
        session,
        orchestrator,
        rx,
    }
}

fn drain_types(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut types = Vec::new();
    while let Ok(text) = rx.try_recv() {
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        types.push(value["type"].as_str().unwrap().to_string());
    }
    types
}

fn line_args() -> serde_json::Value {
    json!({"paths": [{"type": "line", "points": [{"x": 0, "y": 0}, {"x": 100, "y": 100}]}]})
}

#[tokio::test]
async fn plain_turn_streams_thinking_and_ends_idle() {
    let dir = tempfile::tempdir().unwrap();
    let mut rig = rig(
        dir.path(),
        vec![vec![
            ScriptStep::Text("considering the".into()),
            ScriptStep::Text(" horizon".into()),
        ]],
    )
    .await;

    let done = rig.orchestrator.run_turn().await.unwrap();
    assert!(!done);

    let types = drain_types(&mut rig.rx);
    assert!(types.contains(&"status".to_string()));
    assert!(types.contains(&"iteration".to_string()));
    assert_eq!(types.iter().filter(|t| *t == "thinking_delta").count(), 2);

    let snap = rig.store.snapshot().await;
    assert_eq!(snap.monologue, "considering the horizon");
    assert_eq!(snap.status, atelier_types::AgentStatus::Idle);
}

#[tokio::test]
async fn drawing_turn_queues_a_batch_and_notifies() {
    let dir = tempfile::tempdir().unwrap();
    let mut rig = rig(
        dir.path(),
        vec![vec![ScriptStep::CallTool {
            name: "draw_paths".into(),
            args: line_args(),
        }]],
    )
    .await;

    rig.orchestrator.run_turn().await.unwrap();

    let types = drain_types(&mut rig.rx);
    assert!(types.contains(&"agent_strokes_ready".to_string()));
    assert_eq!(types.iter().filter(|t| *t == "code_execution").count(), 2);

    let pending = rig.store.pending_strokes().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].batch_id, 1);
    assert_eq!(rig.store.snapshot().await.canvas.strokes.len(), 1);
}

#[tokio::test]
async fn oil_round_in_paint_mode_expands_to_five_pending_entries() {
    let dir = tempfile::tempdir().unwrap();
    let rig = rig(
        dir.path(),
        vec![vec![ScriptStep::CallTool {
            name: "draw_paths".into(),
            args: json!({"paths": [{
                "type": "polyline",
                "points": [{"x": 10, "y": 10}, {"x": 200, "y": 200}, {"x": 400, "y": 100}],
                "brush": "oil_round",
            }]}),
        }]],
    )
    .await;
    rig.store.set_style(DrawingStyle::Paint).await.unwrap();

    rig.orchestrator.run_turn().await.unwrap();

    // oil_round has 4 bristles: main stroke + 4 sub-strokes, one batch id.
    let pending = rig.store.pending_strokes().await;
    assert_eq!(pending.len(), 5);
    assert!(pending.iter().all(|p| p.batch_id == pending[0].batch_id));
}

#[tokio::test]
async fn mark_piece_done_latches_and_saves_to_gallery() {
    let dir = tempfile::tempdir().unwrap();
    let mut rig = rig(
        dir.path(),
        vec![vec![
            ScriptStep::CallTool {
                name: "draw_paths".into(),
                args: line_args(),
            },
            ScriptStep::CallTool {
                name: "mark_piece_done".into(),
                args: json!({}),
            },
        ]],
    )
    .await;

    let done = rig.orchestrator.run_turn().await.unwrap();
    assert!(done);
    assert!(rig.orchestrator.piece_completed());

    let types = drain_types(&mut rig.rx);
    assert!(types.contains(&"piece_state".to_string()));
    assert!(types.contains(&"gallery_update".to_string()));

    let gallery = rig.store.list_gallery().await.unwrap();
    assert_eq!(gallery.len(), 1);
    assert_eq!(gallery[0].piece_number, 1);
}

#[tokio::test]
async fn nudges_are_drained_into_the_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let rig = rig(dir.path(), vec![vec![], vec![]]).await;

    rig.orchestrator.add_nudge("more blue".to_string()).await;
    rig.orchestrator.add_nudge("bolder lines".to_string()).await;
    rig.orchestrator.run_turn().await.unwrap();

    let prompts = rig.session.prompts.lock().await;
    assert!(prompts[0].text.contains("Human nudges:"));
    assert!(prompts[0].text.contains("- more blue"));
    assert!(prompts[0].text.contains("- bolder lines"));
    assert!(prompts[0].canvas_png_base64.is_some());
    drop(prompts);

    // A second turn must not see the already-delivered nudges.
    rig.orchestrator.run_turn().await.unwrap();
    let prompts = rig.session.prompts.lock().await;
    assert!(!prompts[1].text.contains("Human nudges:"));
}

#[tokio::test]
async fn nudge_clears_the_completion_latch() {
    let dir = tempfile::tempdir().unwrap();
    let rig = rig(
        dir.path(),
        vec![vec![
            ScriptStep::CallTool {
                name: "draw_paths".into(),
                args: line_args(),
            },
            ScriptStep::CallTool {
                name: "mark_piece_done".into(),
                args: json!({}),
            },
        ]],
    )
    .await;

    rig.orchestrator.run_turn().await.unwrap();
    assert!(rig.orchestrator.piece_completed());

    rig.orchestrator.add_nudge("one more pass".into()).await;
    assert!(!rig.orchestrator.piece_completed());
}

#[tokio::test]
async fn session_error_event_is_broadcast_and_turn_survives() {
    let dir = tempfile::tempdir().unwrap();
    let mut rig = rig(
        dir.path(),
        vec![vec![
            ScriptStep::Text("starting".into()),
            ScriptStep::Error("provider hiccup".into()),
        ]],
    )
    .await;

    let done = rig.orchestrator.run_turn().await.unwrap();
    assert!(!done);
    let types = drain_types(&mut rig.rx);
    assert!(types.contains(&"error".to_string()));
}

#[tokio::test]
async fn abort_discards_batches_before_they_queue() {
    let dir = tempfile::tempdir().unwrap();
    let rig = rig(dir.path(), vec![]).await;
    // Connect so tool dispatch has a context to run against.
    rig.orchestrator.connect_session().await.unwrap();

    rig.orchestrator.set_abort();
    let registry = drawing_registry();
    let out = registry
        .execute(
            rig.orchestrator.tool_context(),
            &atelier_tools::ToolCall::new("c1", "draw_paths", line_args()),
        )
        .await;
    assert!(!out.is_error);

    // The stroke lands on the canvas, but the batch from the aborted turn
    // never reaches the pending queue.
    assert_eq!(rig.store.snapshot().await.canvas.strokes.len(), 1);
    assert!(rig.store.pending_strokes().await.is_empty());
    assert_eq!(rig.store.stroke_batch_id().await, 0);
}

#[tokio::test]
async fn reconnecting_session_happens_once_per_connection() {
    let dir = tempfile::tempdir().unwrap();
    let rig = rig(dir.path(), vec![vec![], vec![]]).await;
    rig.orchestrator.run_turn().await.unwrap();
    rig.orchestrator.run_turn().await.unwrap();
    // Lazy connect on the first turn only; the session then stays up.
    assert_eq!(rig.session.connects().await, 1);
}
