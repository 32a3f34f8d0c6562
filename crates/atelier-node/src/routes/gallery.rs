// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Authenticated gallery routes.

use std::sync::OnceLock;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use regex::Regex;

use atelier_render::render_strokes_png;

use crate::app::AppState;
use crate::auth::authenticate;
use crate::error::GatewayError;

fn piece_png_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^piece_(\d+)\.png$").expect("piece regex compiles"))
}

/// GET /gallery — the user's gallery metadata.
pub async fn get_gallery(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = authenticate(app.validator.as_ref(), &headers)?;
    let store = app.user_store(&user_id).await?;
    let entries = store.list_gallery().await.map_err(GatewayError::internal)?;
    Ok(Json(entries))
}

/// GET /gallery/thumbnail/{piece_id}.png — cache-forever thumbnail.
pub async fn get_gallery_thumbnail(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = authenticate(app.validator.as_ref(), &headers)?;

    let piece_number: u32 = piece_png_regex()
        .captures(&file)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| GatewayError::BadRequest("invalid piece_id format".to_string()))?;

    let store = app.user_store(&user_id).await?;
    let (strokes, _style) = store
        .load_from_gallery(piece_number)
        .await
        .map_err(GatewayError::internal)?
        .ok_or_else(|| GatewayError::NotFound("piece not found".to_string()))?;
    if strokes.is_empty() {
        return Err(GatewayError::NotFound("piece has no strokes".to_string()));
    }

    let (width, height) = (app.config.canvas.width, app.config.canvas.height);
    let png = tokio::task::spawn_blocking(move || render_strokes_png(&strokes, width, height))
        .await
        .map_err(GatewayError::internal)?
        .map_err(GatewayError::internal)?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (
                header::CACHE_CONTROL,
                "public, max-age=604800, immutable",
            ),
        ],
        png,
    ))
}
