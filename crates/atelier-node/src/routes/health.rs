// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::app::AppState;

/// GET /health
pub async fn health(State(app): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": if app.shutdown.is_shutting_down() { "shutting_down" } else { "ok" },
        "active_workspaces": app.registry.active_count().await,
    }))
}

/// GET /version
pub async fn version() -> impl IntoResponse {
    Json(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }))
}
