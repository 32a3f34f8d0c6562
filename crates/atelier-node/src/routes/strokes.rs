// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Stroke polling and piece number routes.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;

use crate::app::AppState;
use crate::auth::authenticate;
use crate::error::GatewayError;

/// GET /strokes/pending — atomically take and return the pending queue.
///
/// The client calls this after `agent_strokes_ready` and animates the
/// returned strokes locally.  Each stroke is returned exactly once;
/// `piece_number` lets the client discard a batch from a previous canvas.
pub async fn get_pending_strokes(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = authenticate(app.validator.as_ref(), &headers)?;
    let store = app.user_store(&user_id).await?;
    let piece_number = store.piece_number().await;
    let strokes = store.pop_strokes().await.map_err(GatewayError::internal)?;
    let count = strokes.len();
    Ok(Json(serde_json::json!({
        "strokes": strokes,
        "count": count,
        "piece_number": piece_number,
    })))
}

/// POST /piece_number/{n} — set the piece number (admin/dev).
pub async fn set_piece_number(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(number): Path<u32>,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = authenticate(app.validator.as_ref(), &headers)?;
    let store = app.user_store(&user_id).await?;
    store
        .set_piece_number(number)
        .await
        .map_err(GatewayError::internal)?;
    Ok(Json(serde_json::json!({ "piece_number": number })))
}
