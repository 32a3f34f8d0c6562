// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
/// End-to-end tests over the assembled stack: registry activation, a
/// scripted drawing turn, client fetch, and piece numbering invariants.
use std::sync::Arc;

use atelier_config::Config;
use atelier_core::{Dispatcher, SessionFactory, WorkspaceRegistry};
use atelier_session::{AgentSession, ScriptStep, ScriptedSession};
use atelier_types::{ClientMessage, Point};
use serde_json::json;
use tokio::sync::mpsc;

const USER: &str = "6a1f0a4e-9d0e-4bbb-a8a1-1d20f2a0c9ee";

fn drawing_script() -> Vec<Vec<ScriptStep>> {
    vec![vec![
        ScriptStep::Text("laying down the first gesture".into()),
        ScriptStep::CallTool {
            name: "draw_paths".into(),
            args: json!({"paths": [
                {"type": "line", "points": [{"x": 100, "y": 100}, {"x": 700, "y": 500}]}
            ]}),
        },
        ScriptStep::CallTool {
            name: "mark_piece_done".into(),
            args: json!({}),
        },
    ]]
}

fn registry_with(
    root: &std::path::Path,
    scripts: Vec<Vec<ScriptStep>>,
) -> Arc<WorkspaceRegistry> {
    let mut config = Config::default();
    config.workspace.root = root.to_path_buf();
    // Keep draw-gate waits negligible in tests.
    config.agent.max_animation_wait_s = 0.005;
    config.agent.animation_wait_buffer_ms = 1;

    let scripts = std::sync::Mutex::new(Some(scripts));
    let factory: SessionFactory = Arc::new(move |_user: &str| -> Arc<dyn AgentSession> {
        let scripts = scripts.lock().unwrap().take().unwrap_or_default();
        Arc::new(ScriptedSession::new(scripts))
    });
    WorkspaceRegistry::new(Arc::new(config), factory, None)
}

#[tokio::test]
async fn scripted_turn_draws_persists_and_latches() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(dir.path(), drawing_script());

    let ws = registry.get_or_activate(USER).await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = ws.connections.add(tx).unwrap();
    ws.on_client_connected(conn).await.unwrap();

    let done = ws.orchestrator.run_turn().await.unwrap();
    assert!(done);
    assert!(ws.orchestrator.piece_completed());

    // The client was told to fetch, and the fetch drains the queue.
    let mut saw_ready = false;
    while let Ok(text) = rx.try_recv() {
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        if value["type"] == "agent_strokes_ready" {
            saw_ready = true;
            assert_eq!(value["piece_number"], 1);
        }
    }
    assert!(saw_ready);

    let fetched = ws.store.pop_strokes().await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert!(ws.store.pop_strokes().await.unwrap().is_empty());

    // Gallery piece numbers equal {1, …, piece_number − 1} after new_canvas.
    let dispatcher = Dispatcher::new(60);
    dispatcher
        .handle(
            &ws,
            conn,
            ClientMessage::NewCanvas {
                direction: None,
                drawing_style: None,
            },
        )
        .await
        .unwrap();

    let piece_number = ws.store.piece_number().await;
    let gallery = ws.store.list_gallery().await.unwrap();
    let numbers: Vec<u32> = gallery.iter().map(|e| e.piece_number).collect();
    assert_eq!(numbers, (1..piece_number).collect::<Vec<u32>>());

    registry.shutdown_all().await;
}

#[tokio::test]
async fn workspace_survives_deactivation_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_with(dir.path(), vec![]);

    let ws = registry.get_or_activate(USER).await.unwrap();
    ws.store
        .add_stroke(atelier_types::Path::polyline(vec![
            Point::new(1.0, 2.0),
            Point::new(3.0, 4.0),
        ]))
        .await
        .unwrap();
    registry.shutdown_all().await;
    assert_eq!(registry.active_count().await, 0);

    let ws = registry.get_or_activate(USER).await.unwrap();
    assert_eq!(ws.store.snapshot().await.canvas.strokes.len(), 1);
    registry.shutdown_all().await;
}
