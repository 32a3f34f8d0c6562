// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Unauthenticated public gallery routes for opted-in users.
//!
//! Path parameters are validated strictly before touching the filesystem:
//! user ids must match an anchored UUID pattern, piece ids are restricted
//! to alphanumerics plus `_`/`-`.

use std::sync::OnceLock;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use regex::Regex;
use serde::Deserialize;

use atelier_render::render_og_image;
use atelier_state::WorkspaceStore;

use crate::app::{store_options, AppState};
use crate::error::GatewayError;

fn uuid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
            .expect("uuid regex compiles")
    })
}

fn valid_piece_id(piece_id: &str) -> bool {
    !piece_id.is_empty()
        && piece_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// `piece_000123` → 123
fn piece_number_of(piece_id: &str) -> Option<u32> {
    piece_id.strip_prefix("piece_")?.parse().ok()
}

#[derive(Debug, Deserialize)]
pub struct PublicGalleryParams {
    pub limit: Option<usize>,
}

async fn open_store(
    app: &AppState,
    user_id: &str,
) -> Result<std::sync::Arc<WorkspaceStore>, GatewayError> {
    WorkspaceStore::load_for_user(user_id, &app.config.workspace.root, store_options(&app.config))
        .await
        .map_err(GatewayError::internal)
}

/// GET /public/gallery?limit=N — newest pieces across opted-in users.
pub async fn get_public_gallery(
    State(app): State<AppState>,
    Query(params): Query<PublicGalleryParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let limit = params.limit.unwrap_or(12).min(50);

    let mut pieces = Vec::new();
    for user_id in app.users.list_public_users().await {
        if !uuid_regex().is_match(&user_id) {
            continue;
        }
        let store = match open_store(&app, &user_id).await {
            Ok(store) => store,
            Err(_) => continue,
        };
        let Ok(entries) = store.list_gallery().await else {
            continue;
        };
        for entry in entries {
            pieces.push(serde_json::json!({
                "id": entry.id,
                "user_id": user_id,
                "piece_number": entry.piece_number,
                "stroke_count": entry.stroke_count,
                "created_at": entry.created_at,
                "title": entry.title,
            }));
        }
    }

    // Most recent first across all users.
    pieces.sort_by(|a, b| {
        b["created_at"]
            .as_str()
            .unwrap_or("")
            .cmp(a["created_at"].as_str().unwrap_or(""))
    });
    pieces.truncate(limit);
    Ok(Json(pieces))
}

/// Shared validation for the per-piece public routes.
async fn load_public_piece(
    app: &AppState,
    user_id: &str,
    piece_id: &str,
) -> Result<Vec<atelier_types::Path>, GatewayError> {
    if !uuid_regex().is_match(user_id) {
        return Err(GatewayError::BadRequest("invalid user_id".to_string()));
    }
    if !valid_piece_id(piece_id) {
        return Err(GatewayError::BadRequest("invalid piece_id".to_string()));
    }
    if !app.users.is_public(user_id).await {
        return Err(GatewayError::NotFound("gallery not found".to_string()));
    }

    let piece_number = piece_number_of(piece_id)
        .ok_or_else(|| GatewayError::NotFound("piece not found".to_string()))?;
    let store = open_store(app, user_id).await?;
    let (strokes, _style) = store
        .load_from_gallery(piece_number)
        .await
        .map_err(GatewayError::internal)?
        .ok_or_else(|| GatewayError::NotFound("piece not found".to_string()))?;
    Ok(strokes)
}

/// GET /public/gallery/{user_id}/{piece_id}/strokes
pub async fn get_public_piece_strokes(
    State(app): State<AppState>,
    Path((user_id, piece_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, GatewayError> {
    let strokes = load_public_piece(&app, &user_id, &piece_id).await?;
    Ok(Json(serde_json::json!({
        "id": piece_id,
        "user_id": user_id,
        "strokes": strokes,
    })))
}

/// GET /public/gallery/{user_id}/{piece_id}/og-image.png — 1200×630 share
/// image.
pub async fn get_public_og_image(
    State(app): State<AppState>,
    Path((user_id, piece_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, GatewayError> {
    let strokes = load_public_piece(&app, &user_id, &piece_id).await?;
    let (width, height) = (app.config.canvas.width, app.config.canvas.height);
    let png = tokio::task::spawn_blocking(move || render_og_image(&strokes, width, height))
        .await
        .map_err(GatewayError::internal)?
        .map_err(GatewayError::internal)?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        png,
    ))
}
