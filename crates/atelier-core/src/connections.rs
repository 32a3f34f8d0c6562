// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Per-user connection fan-out.
//!
//! Each WebSocket registers the sender half of an unbounded channel; the
//! node's write task drains the receiver into the socket.  Per-connection
//! ordering follows the order of `broadcast`/`send_to` calls because the
//! channel is FIFO.

use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{info, warn};

use atelier_types::ServerMessage;

pub type ConnectionId = u64;

struct Inner {
    next_id: ConnectionId,
    connections: Vec<(ConnectionId, mpsc::UnboundedSender<String>)>,
}

/// Connection set scoped to a single user.  Only that user's sockets ever
/// appear here.
pub struct ConnectionSet {
    user_id: String,
    /// 0 = unlimited.
    max_connections: usize,
    inner: Mutex<Inner>,
}

impl ConnectionSet {
    pub fn new(user_id: impl Into<String>, max_connections: usize) -> Self {
        Self {
            user_id: user_id.into(),
            max_connections,
            inner: Mutex::new(Inner {
                next_id: 1,
                connections: Vec::new(),
            }),
        }
    }

    /// Register a connection.  Returns `None` when the per-user cap is
    /// reached.
    pub fn add(&self, tx: mpsc::UnboundedSender<String>) -> Option<ConnectionId> {
        let mut inner = self.inner.lock().expect("connection lock");
        if self.max_connections > 0 && inner.connections.len() >= self.max_connections {
            warn!(
                user = %self.user_id,
                limit = self.max_connections,
                "connection limit reached, rejecting"
            );
            return None;
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.connections.push((id, tx));
        info!(user = %self.user_id, total = inner.connections.len(), "connection added");
        Some(id)
    }

    pub fn remove(&self, id: ConnectionId) {
        let mut inner = self.inner.lock().expect("connection lock");
        inner.connections.retain(|(cid, _)| *cid != id);
        info!(user = %self.user_id, total = inner.connections.len(), "connection removed");
    }

    /// Send to every connection.  A connection whose channel is closed is
    /// evicted; the others are unaffected.
    pub fn broadcast(&self, message: &ServerMessage) {
        let Ok(text) = serde_json::to_string(message) else {
            warn!(user = %self.user_id, "failed to serialize broadcast");
            return;
        };
        let mut inner = self.inner.lock().expect("connection lock");
        inner
            .connections
            .retain(|(id, tx)| match tx.send(text.clone()) {
                Ok(()) => true,
                Err(_) => {
                    warn!(user = %self.user_id, conn = id, "dropping dead connection");
                    false
                }
            });
    }

    /// Unicast to one connection.  Returns false when it is gone.
    pub fn send_to(&self, id: ConnectionId, message: &ServerMessage) -> bool {
        let Ok(text) = serde_json::to_string(message) else {
            return false;
        };
        let inner = self.inner.lock().expect("connection lock");
        inner
            .connections
            .iter()
            .find(|(cid, _)| *cid == id)
            .map(|(_, tx)| tx.send(text).is_ok())
            .unwrap_or(false)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.lock().expect("connection lock").connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connection_count() == 0
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
