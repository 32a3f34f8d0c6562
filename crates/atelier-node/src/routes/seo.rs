// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! sitemap.xml and robots.txt.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::app::AppState;

/// GET /sitemap.xml — homepage plus the public pieces.
pub async fn sitemap(State(app): State<AppState>) -> impl IntoResponse {
    let base = app.config.server.public_base_url.trim_end_matches('/').to_string();

    let mut urls = vec![format!("{base}/")];
    for user_id in app.users.list_public_users().await {
        urls.push(format!("{base}/public/gallery/{user_id}"));
    }

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    for url in urls {
        xml.push_str(&format!("  <url><loc>{url}</loc></url>\n"));
    }
    xml.push_str("</urlset>\n");

    ([(header::CONTENT_TYPE, "application/xml")], xml)
}

/// GET /robots.txt
pub async fn robots(State(app): State<AppState>) -> impl IntoResponse {
    let base = app.config.server.public_base_url.trim_end_matches('/').to_string();
    let body = format!(
        "User-agent: *\nAllow: /\nDisallow: /ws\nDisallow: /strokes\n\nSitemap: {base}/sitemap.xml\n"
    );
    ([(header::CONTENT_TYPE, "text/plain")], body)
}
