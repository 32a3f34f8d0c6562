// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Canvas state and snapshot routes.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;

use atelier_render::{render_canvas_png, render_canvas_svg};
use atelier_types::style_config;

use crate::app::AppState;
use crate::auth::authenticate;
use crate::error::GatewayError;

/// GET /state — current canvas state summary.
pub async fn get_state(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = authenticate(app.validator.as_ref(), &headers)?;
    let store = app.user_store(&user_id).await?;
    let snapshot = store.snapshot().await;
    Ok(Json(serde_json::json!({
        "canvas": snapshot.canvas,
        "status": snapshot.status,
        "piece_number": snapshot.piece_number,
    })))
}

/// GET /canvas.png — rendered snapshot.
pub async fn get_canvas_png(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = authenticate(app.validator.as_ref(), &headers)?;
    let store = app.user_store(&user_id).await?;
    let snapshot = store.snapshot().await;
    let config = style_config(snapshot.canvas.drawing_style);

    let png = tokio::task::spawn_blocking(move || {
        render_canvas_png(&snapshot.canvas, &config, true)
    })
    .await
    .map_err(GatewayError::internal)?
    .map_err(GatewayError::internal)?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// GET /canvas.svg — rendered snapshot.
pub async fn get_canvas_svg(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = authenticate(app.validator.as_ref(), &headers)?;
    let store = app.user_store(&user_id).await?;
    let snapshot = store.snapshot().await;
    let svg = render_canvas_svg(&snapshot.canvas);
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}
