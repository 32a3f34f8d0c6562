// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! End-to-end tool tests against a real workspace store and a recording
//! draw hook.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use atelier_state::{StoreOptions, WorkspaceStore};
use atelier_tools::context::RecordingDrawHook;
use atelier_tools::{drawing_registry, SandboxSettings, ToolCall, ToolContext};

const USER: &str = "6a1f0a4e-9d0e-4bbb-a8a1-1d20f2a0c9ee";

async fn context(dir: &std::path::Path) -> (ToolContext, Arc<RecordingDrawHook>) {
    let store = WorkspaceStore::load_for_user(USER, dir, StoreOptions::default())
        .await
        .unwrap();
    let hook = Arc::new(RecordingDrawHook::default());
    let ctx = ToolContext {
        store,
        canvas_width: 800,
        canvas_height: 600,
        draw: hook.clone(),
        image_provider: None,
        image_timeout: Duration::from_secs(5),
        sandbox: SandboxSettings::default(),
    };
    (ctx, hook)
}

fn call(name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall::new("call_1", name, args)
}

#[tokio::test]
async fn draw_paths_adds_strokes_and_fires_hook_once() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, hook) = context(dir.path()).await;
    let registry = drawing_registry();

    let out = registry
        .execute(
            &ctx,
            &call(
                "draw_paths",
                json!({"paths": [
                    {"type": "line", "points": [{"x": 0, "y": 0}, {"x": 100, "y": 100}]},
                    {"type": "polyline", "points": [{"x": 0, "y": 50}, {"x": 50, "y": 50}, {"x": 100, "y": 0}]},
                ]}),
            ),
        )
        .await;

    assert!(!out.is_error, "{}", out.content);
    assert!(out.content.contains("Successfully drew 2 paths"));
    assert!(out.has_images());

    assert_eq!(ctx.store.snapshot().await.canvas.strokes.len(), 2);
    let calls = hook.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.len(), 2);
    assert!(!calls[0].1);
}

#[tokio::test]
async fn draw_paths_reports_per_path_errors() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _hook) = context(dir.path()).await;
    let registry = drawing_registry();

    let out = registry
        .execute(
            &ctx,
            &call(
                "draw_paths",
                json!({"paths": [
                    {"type": "line", "points": [{"x": 0, "y": 0}]},
                    {"type": "line", "points": [{"x": 0, "y": 0}, {"x": 10, "y": 10}]},
                ]}),
            ),
        )
        .await;

    assert!(!out.is_error);
    assert!(out.content.contains("Parsed 1 paths with 1 errors"));
    assert_eq!(ctx.store.snapshot().await.canvas.strokes.len(), 1);
}

#[tokio::test]
async fn draw_paths_with_only_invalid_paths_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, hook) = context(dir.path()).await;
    let registry = drawing_registry();

    let out = registry
        .execute(
            &ctx,
            &call("draw_paths", json!({"paths": [{"type": "spiral"}]})),
        )
        .await;

    assert!(out.is_error);
    assert!(ctx.store.snapshot().await.canvas.strokes.is_empty());
    assert!(hook.calls.lock().await.is_empty());
}

#[tokio::test]
async fn draw_paths_done_flag_reaches_the_hook() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, hook) = context(dir.path()).await;
    let registry = drawing_registry();

    let out = registry
        .execute(
            &ctx,
            &call(
                "draw_paths",
                json!({
                    "paths": [{"type": "line", "points": [{"x": 0, "y": 0}, {"x": 1, "y": 1}]}],
                    "done": true,
                }),
            ),
        )
        .await;

    assert!(out.content.contains("Piece marked as complete"));
    assert!(hook.calls.lock().await[0].1);
}

#[tokio::test]
async fn mark_piece_done_fires_hook_with_no_paths() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, hook) = context(dir.path()).await;
    let registry = drawing_registry();

    let out = registry
        .execute(&ctx, &call("mark_piece_done", json!({})))
        .await;

    assert!(!out.is_error);
    let calls = hook.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.is_empty());
    assert!(calls[0].1);
}

#[tokio::test]
async fn view_canvas_returns_an_image() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _hook) = context(dir.path()).await;
    let registry = drawing_registry();

    let out = registry.execute(&ctx, &call("view_canvas", json!({}))).await;
    assert!(!out.is_error);
    assert!(out.has_images());
}

#[tokio::test]
async fn sign_canvas_adds_a_signature_stroke() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, hook) = context(dir.path()).await;
    let registry = drawing_registry();

    let out = registry
        .execute(
            &ctx,
            &call("sign_canvas", json!({"position": "bottom_left", "size": "small"})),
        )
        .await;

    assert!(!out.is_error, "{}", out.content);
    let snapshot = ctx.store.snapshot().await;
    assert_eq!(snapshot.canvas.strokes.len(), 1);
    assert!(snapshot.canvas.strokes[0].d.is_some());
    assert_eq!(hook.calls.lock().await.len(), 1);
}

#[tokio::test]
async fn name_piece_stores_a_capped_title() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _hook) = context(dir.path()).await;
    let registry = drawing_registry();

    let long_title = "x".repeat(300);
    let out = registry
        .execute(&ctx, &call("name_piece", json!({"title": long_title})))
        .await;

    assert!(!out.is_error);
    let title = ctx.store.snapshot().await.current_piece_title.unwrap();
    assert_eq!(title.len(), 100);
}

#[tokio::test]
async fn name_piece_requires_a_title() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _hook) = context(dir.path()).await;
    let registry = drawing_registry();

    let out = registry
        .execute(&ctx, &call("name_piece", json!({"title": "   "})))
        .await;
    assert!(out.is_error);
}

#[tokio::test]
async fn imagine_without_provider_is_a_tool_error() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _hook) = context(dir.path()).await;
    let registry = drawing_registry();

    let out = registry
        .execute(&ctx, &call("imagine", json!({"prompt": "a quiet harbor"})))
        .await;
    assert!(out.is_error);
    assert!(out.content.contains("not available"));
}

#[tokio::test]
async fn unknown_tool_is_an_error_not_a_panic() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _hook) = context(dir.path()).await;
    let registry = drawing_registry();

    let out = registry.execute(&ctx, &call("teleport", json!({}))).await;
    assert!(out.is_error);
    assert!(out.content.contains("unknown tool"));
}
