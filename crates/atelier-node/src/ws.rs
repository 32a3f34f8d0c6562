// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! WebSocket endpoint — one socket per client, routed to the owning user's
//! workspace.
//!
//! # Close codes
//!
//! - `4001` — missing or invalid token
//! - `4003` — per-user connection cap exceeded
//! - `1001` — server shutting down (going away)
//!
//! # Wire format
//!
//! JSON text frames.  Inbound frames parse into
//! [`atelier_types::ClientMessage`]; unknown types get an `error` reply and
//! the connection stays open.  Outbound frames are drained from the
//! connection's channel, so per-connection ordering matches broadcast
//! order.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use atelier_types::{ClientMessage, ServerMessage};

use crate::app::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
    /// Client trace id for log correlation.
    pub trace_id: Option<String>,
}

/// HTTP handler for GET /ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app): State<AppState>,
    Query(params): Query<WsParams>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app, params))
}

async fn close(mut socket: WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}

async fn handle_socket(mut socket: WebSocket, app: AppState, params: WsParams) {
    if app.shutdown.is_shutting_down() {
        close(socket, 1001, "Server shutting down").await;
        return;
    }

    let Some(token) = params.token else {
        close(socket, 4001, "Missing authentication token").await;
        return;
    };
    let user_id = match app.validator.validate(&token) {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!("websocket auth failed: {e}");
            close(socket, 4001, "Invalid token").await;
            return;
        }
    };
    if let Some(trace_id) = &params.trace_id {
        debug!(user = %user_id, trace_id = %trace_id, "client trace id");
    }

    let workspace = match app.registry.get_or_activate(&user_id).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(user = %user_id, "workspace activation failed: {e}");
            close(socket, 1011, "Workspace unavailable").await;
            return;
        }
    };

    let (tx, mut outbound) = mpsc::unbounded_channel::<String>();
    let Some(conn_id) = workspace.connections.add(tx) else {
        close(socket, 4003, "Too many connections").await;
        return;
    };
    info!(user = %user_id, conn = conn_id, "websocket connected");

    if let Err(e) = workspace.on_client_connected(conn_id).await {
        warn!(user = %user_id, "post-connect sequence failed: {e}");
    }

    let mut shutdown = app.shutdown.subscribe();
    loop {
        tokio::select! {
            // Outgoing: drain the connection channel into the socket.
            out = outbound.recv() => {
                match out {
                    Some(text) => {
                        if socket.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            // Incoming client frame.
            frame = socket.recv() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&app, &workspace, conn_id, &text).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // binary frames ignored
                    Some(Err(e)) => {
                        debug!(user = %user_id, "websocket recv error: {e}");
                        break;
                    }
                }
            }
            // Server shutdown: close with "going away".
            _ = shutdown.changed() => {
                close(socket, 1001, "Server shutting down").await;
                break;
            }
        }
    }

    info!(user = %user_id, conn = conn_id, "websocket disconnected");
    app.registry.on_disconnect(&user_id, conn_id).await;
}

/// Parse and dispatch one inbound frame.  Errors answer the offending
/// connection only.
async fn handle_frame(
    app: &AppState,
    workspace: &atelier_core::ActiveWorkspace,
    conn_id: atelier_core::ConnectionId,
    text: &str,
) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(user = %workspace.user_id, "invalid client message: {e}");
            workspace.connections.send_to(
                conn_id,
                &ServerMessage::Error {
                    message: "Unknown or malformed message".to_string(),
                    details: Some(e.to_string()),
                },
            );
            return;
        }
    };

    if let Err(e) = app.dispatcher.handle(workspace, conn_id, message).await {
        warn!(user = %workspace.user_id, "handler error: {e}");
        workspace.connections.send_to(
            conn_id,
            &ServerMessage::Error {
                message: format!("Error processing message: {e}"),
                details: None,
            },
        );
    }
}
