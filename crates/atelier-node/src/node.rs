// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Router assembly and the serve loop.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::app::AppState;
use crate::routes::{canvas, gallery, health, public, seo, strokes};
use crate::ws;

/// Build the full route table.
pub fn build_router(app: AppState) -> Router {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_handler))
        // Authenticated REST
        .route("/state", get(canvas::get_state))
        .route("/canvas.png", get(canvas::get_canvas_png))
        .route("/canvas.svg", get(canvas::get_canvas_svg))
        .route("/gallery", get(gallery::get_gallery))
        .route("/gallery/thumbnail/:file", get(gallery::get_gallery_thumbnail))
        .route("/strokes/pending", get(strokes::get_pending_strokes))
        .route("/piece_number/:number", post(strokes::set_piece_number))
        // Public
        .route("/public/gallery", get(public::get_public_gallery))
        .route(
            "/public/gallery/:user_id/:piece_id/strokes",
            get(public::get_public_piece_strokes),
        )
        .route(
            "/public/gallery/:user_id/:piece_id/og-image.png",
            get(public::get_public_og_image),
        )
        // SEO + operational
        .route("/sitemap.xml", get(seo::sitemap))
        .route("/robots.txt", get(seo::robots))
        .route("/health", get(health::health))
        .route("/version", get(health::version))
        // Tokens, not cookies: any origin may call.
        .layer(CorsLayer::permissive())
        .with_state(app)
}

/// Bind, serve until shutdown is signalled, then run the shutdown
/// sequence (drain, task cancel, cleanup callbacks).
pub async fn serve(app: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&app.config.server.listen).await?;
    info!(listen = %app.config.server.listen, "atelier node listening");

    let mut shutdown_rx = app.shutdown.subscribe();
    let router = build_router(app.clone());
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    app.shutdown.shutdown().await;
    Ok(())
}
