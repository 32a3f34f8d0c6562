// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Registry lifecycle and dispatcher scenarios: pause-on-disconnect,
//! auto-resume, idle deactivation, stroke rate limiting, mid-turn new
//! canvas.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use atelier_core::{ActiveWorkspace, Dispatcher, SessionFactory, WorkspaceRegistry};
use atelier_config::Config;
use atelier_session::{AgentSession, ScriptedSession};
use atelier_types::{
    AgentStatus, ClientMessage, DrawingStyle, PauseReason, Point,
};

const USER: &str = "6a1f0a4e-9d0e-4bbb-a8a1-1d20f2a0c9ee";

fn test_config(root: &std::path::Path) -> Arc<Config> {
    let mut config = Config::default();
    config.workspace.root = root.to_path_buf();
    config.workspace.idle_grace_period_s = 0;
    config.limits.max_strokes_per_minute = 2;
    Arc::new(config)
}

fn scripted_factory() -> SessionFactory {
    Arc::new(|_user: &str| -> Arc<dyn AgentSession> { Arc::new(ScriptedSession::new(vec![])) })
}

async fn registry(root: &std::path::Path) -> Arc<WorkspaceRegistry> {
    WorkspaceRegistry::new(test_config(root), scripted_factory(), None)
}

/// Attach a client connection and return its id plus message receiver.
fn connect(ws: &ActiveWorkspace) -> (u64, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = ws.connections.add(tx).unwrap();
    (id, rx)
}

fn drain_types(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut types = Vec::new();
    while let Ok(text) = rx.try_recv() {
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        types.push(value["type"].as_str().unwrap().to_string());
    }
    types
}

#[tokio::test]
async fn activation_is_idempotent_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;

    let a = registry.get_or_activate(USER).await.unwrap();
    let b = registry.get_or_activate(USER).await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.active_count().await, 1);
    a.stop_agent_loop().await;
}

#[tokio::test]
async fn concurrent_activation_yields_one_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;

    let (a, b) = tokio::join!(
        registry.get_or_activate(USER),
        registry.get_or_activate(USER)
    );
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(registry.active_count().await, 1);
}

#[tokio::test]
async fn last_disconnect_pauses_with_disconnect_reason() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();

    let (id1, _rx1) = connect(&ws);
    let (id2, _rx2) = connect(&ws);

    registry.on_disconnect(USER, id1).await;
    // One client remains: no pause.
    assert_ne!(ws.store.status().await, AgentStatus::Paused);

    registry.on_disconnect(USER, id2).await;
    assert_eq!(ws.store.status().await, AgentStatus::Paused);
    assert_eq!(ws.store.pause_reason().await, PauseReason::Disconnect);
}

#[tokio::test]
async fn user_pause_survives_disconnect_and_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();
    let dispatcher = Dispatcher::new(60);

    let (id, mut rx) = connect(&ws);
    dispatcher
        .handle(&ws, id, ClientMessage::Pause)
        .await
        .unwrap();
    assert_eq!(ws.store.pause_reason().await, PauseReason::User);

    registry.on_disconnect(USER, id).await;
    // Disconnect must not overwrite the user's pause reason.
    assert_eq!(ws.store.pause_reason().await, PauseReason::User);

    // Reconnect: no auto-resume for user pauses.
    let (id2, mut rx2) = connect(&ws);
    ws.on_client_connected(id2).await.unwrap();
    assert_eq!(ws.store.status().await, AgentStatus::Paused);
    assert_eq!(ws.store.pause_reason().await, PauseReason::User);

    let init: serde_json::Value = serde_json::from_str(&rx2.try_recv().unwrap()).unwrap();
    assert_eq!(init["type"], "init");
    assert_eq!(init["paused"], true);
    let _ = drain_types(&mut rx);
}

#[tokio::test]
async fn reconnect_after_disconnect_pause_auto_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();

    let (id, _rx) = connect(&ws);
    registry.on_disconnect(USER, id).await;
    assert_eq!(ws.store.pause_reason().await, PauseReason::Disconnect);

    let ws = registry.get_or_activate(USER).await.unwrap();
    let (id2, mut rx2) = connect(&ws);
    ws.on_client_connected(id2).await.unwrap();

    assert_eq!(ws.store.status().await, AgentStatus::Idle);
    assert_eq!(ws.store.pause_reason().await, PauseReason::None);
    let init: serde_json::Value = serde_json::from_str(&rx2.try_recv().unwrap()).unwrap();
    assert_eq!(init["paused"], false);
    let types = drain_types(&mut rx2);
    assert!(types.contains(&"paused".to_string()));
}

#[tokio::test]
async fn reconnect_is_notified_of_pending_strokes() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();

    let path = atelier_types::Path::polyline(vec![Point::new(0.0, 0.0), Point::new(9.0, 9.0)]);
    ws.store.queue_strokes(&[path]).await.unwrap();

    let (id, _rx) = connect(&ws);
    registry.on_disconnect(USER, id).await;

    let (id2, mut rx2) = connect(&ws);
    ws.on_client_connected(id2).await.unwrap();
    let types = drain_types(&mut rx2);
    assert!(types.contains(&"agent_strokes_ready".to_string()));
}

#[tokio::test]
async fn idle_workspace_deactivates_after_grace_period() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();

    let (id, _rx) = connect(&ws);
    registry.on_disconnect(USER, id).await;

    // Grace period is zero in the test config.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(registry.get(USER).await.is_none());
    assert_eq!(registry.active_count().await, 0);
}

#[tokio::test]
async fn reconnect_within_grace_cancels_deactivation() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.workspace.root = dir.path().to_path_buf();
    config.workspace.idle_grace_period_s = 3600;
    let registry = WorkspaceRegistry::new(Arc::new(config), scripted_factory(), None);

    let ws = registry.get_or_activate(USER).await.unwrap();
    let (id, _rx) = connect(&ws);
    registry.on_disconnect(USER, id).await;

    // Reconnect cancels the pending idle timer.
    let ws = registry.get_or_activate(USER).await.unwrap();
    let (_id2, _rx2) = connect(&ws);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(registry.get(USER).await.is_some());
}

#[tokio::test]
async fn shutdown_all_saves_and_drops_everything() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();
    ws.store
        .add_stroke(atelier_types::Path::polyline(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
        ]))
        .await
        .unwrap();

    registry.shutdown_all().await;
    assert_eq!(registry.active_count().await, 0);
    assert!(dir.path().join(USER).join("workspace.json").is_file());
}

// ── Dispatcher scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn strokes_over_the_rate_limit_get_an_error_reply() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();
    // Matches the test config's two-per-minute limit.
    let dispatcher = Dispatcher::new(2);

    let (id, mut rx) = connect(&ws);
    for _ in 0..3 {
        dispatcher
            .handle(
                &ws,
                id,
                ClientMessage::Stroke {
                    points: vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)],
                },
            )
            .await
            .unwrap();
    }

    let types = drain_types(&mut rx);
    assert_eq!(types.iter().filter(|t| *t == "stroke_complete").count(), 2);
    assert_eq!(types.iter().filter(|t| *t == "error").count(), 1);
    assert_eq!(ws.store.snapshot().await.canvas.strokes.len(), 2);
}

#[tokio::test]
async fn human_strokes_are_clamped_and_attributed() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();
    let dispatcher = Dispatcher::new(60);

    let (id, _rx) = connect(&ws);
    dispatcher
        .handle(
            &ws,
            id,
            ClientMessage::Stroke {
                points: vec![Point::new(-10.0, 0.0), Point::new(5000.0, 5000.0)],
            },
        )
        .await
        .unwrap();

    let snap = ws.store.snapshot().await;
    let stroke = &snap.canvas.strokes[0];
    assert_eq!(stroke.author, atelier_types::Author::Human);
    assert_eq!(stroke.points[0].x, 0.0);
    assert_eq!(stroke.points[1].x, snap.canvas.width as f64);
}

#[tokio::test]
async fn non_finite_stroke_is_rejected_and_canvas_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();
    let dispatcher = Dispatcher::new(60);

    let (id, _rx) = connect(&ws);
    let result = dispatcher
        .handle(
            &ws,
            id,
            ClientMessage::Stroke {
                points: vec![Point::new(f64::NAN, 0.0), Point::new(1.0, 1.0)],
            },
        )
        .await;
    assert!(result.is_err());
    assert!(ws.store.snapshot().await.canvas.strokes.is_empty());
}

#[tokio::test]
async fn mid_turn_new_canvas_clears_pending_and_advances() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();
    let dispatcher = Dispatcher::new(60);

    // Simulate an in-flight turn that queued a batch.
    let path = atelier_types::Path::polyline(vec![Point::new(0.0, 0.0), Point::new(50.0, 50.0)]);
    ws.store.add_stroke(path.clone()).await.unwrap();
    ws.store.queue_strokes(&[path]).await.unwrap();

    let (id, mut rx) = connect(&ws);
    dispatcher
        .handle(
            &ws,
            id,
            ClientMessage::NewCanvas {
                direction: Some("try something looser".into()),
                drawing_style: None,
            },
        )
        .await
        .unwrap();

    let snap = ws.store.snapshot().await;
    assert!(snap.canvas.strokes.is_empty());
    assert_eq!(snap.pending_count, 0);
    assert_eq!(snap.piece_number, 2);
    assert_eq!(snap.status, AgentStatus::Idle);

    let gallery = ws.store.list_gallery().await.unwrap();
    assert_eq!(gallery.len(), 1);

    let types = drain_types(&mut rx);
    assert!(types.contains(&"new_canvas".to_string()));
    assert!(types.contains(&"gallery_update".to_string()));
    assert!(types.contains(&"piece_state".to_string()));
    assert!(types.contains(&"paused".to_string()));
}

#[tokio::test]
async fn clear_aborts_and_empties_canvas_and_queue() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();
    let dispatcher = Dispatcher::new(60);

    let path = atelier_types::Path::polyline(vec![Point::new(0.0, 0.0), Point::new(50.0, 50.0)]);
    ws.store.add_stroke(path.clone()).await.unwrap();
    ws.store.queue_strokes(&[path]).await.unwrap();

    let (id, mut rx) = connect(&ws);
    dispatcher.handle(&ws, id, ClientMessage::Clear).await.unwrap();

    let snap = ws.store.snapshot().await;
    assert!(snap.canvas.strokes.is_empty());
    assert_eq!(snap.pending_count, 0);
    // Clear, unlike new_canvas, does not persist to the gallery.
    assert!(ws.store.list_gallery().await.unwrap().is_empty());
    assert!(drain_types(&mut rx).contains(&"clear".to_string()));
}

#[tokio::test]
async fn set_style_broadcasts_exactly_once_per_change() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();
    let dispatcher = Dispatcher::new(60);

    let (id, mut rx) = connect(&ws);
    for _ in 0..2 {
        dispatcher
            .handle(
                &ws,
                id,
                ClientMessage::SetStyle {
                    drawing_style: DrawingStyle::Paint,
                },
            )
            .await
            .unwrap();
    }

    let types = drain_types(&mut rx);
    assert_eq!(types.iter().filter(|t| *t == "style_change").count(), 1);
    assert_eq!(ws.store.drawing_style().await, DrawingStyle::Paint);
}

#[tokio::test]
async fn load_canvas_restores_gallery_strokes() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();
    let dispatcher = Dispatcher::new(60);

    let path = atelier_types::Path::polyline(vec![Point::new(0.0, 0.0), Point::new(7.0, 7.0)]);
    ws.store.add_stroke(path.clone()).await.unwrap();
    ws.store.new_canvas().await.unwrap();
    assert!(ws.store.snapshot().await.canvas.strokes.is_empty());

    let (id, mut rx) = connect(&ws);
    dispatcher
        .handle(
            &ws,
            id,
            ClientMessage::LoadCanvas {
                canvas_id: "piece_000001".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(ws.store.snapshot().await.canvas.strokes, vec![path]);
    assert!(drain_types(&mut rx).contains(&"load_canvas".to_string()));
}

#[tokio::test]
async fn load_canvas_with_bad_id_errors_only_the_sender() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path()).await;
    let ws = registry.get_or_activate(USER).await.unwrap();
    let dispatcher = Dispatcher::new(60);

    let (id, mut rx) = connect(&ws);
    let (_other, mut other_rx) = connect(&ws);
    dispatcher
        .handle(
            &ws,
            id,
            ClientMessage::LoadCanvas {
                canvas_id: "piece_000099".into(),
            },
        )
        .await
        .unwrap();

    assert!(drain_types(&mut rx).contains(&"error".to_string()));
    assert!(drain_types(&mut other_rx).is_empty());
}
