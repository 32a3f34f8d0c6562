// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;
use std::time::Duration;

use atelier_config::Config;
use atelier_core::{Dispatcher, ShutdownCoordinator, WorkspaceRegistry};
use atelier_state::{StoreOptions, WorkspaceStore};

use crate::auth::TokenValidator;
use crate::error::GatewayError;
use crate::users::UserDirectory;

/// Shared state for every route handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<WorkspaceRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub validator: Arc<dyn TokenValidator>,
    pub users: Arc<dyn UserDirectory>,
}

/// Store options mirroring what the registry uses at activation, so REST
/// access to a not-yet-active workspace sees the same tuning.
pub fn store_options(config: &Config) -> StoreOptions {
    StoreOptions {
        max_workspace_bytes: config.workspace.max_workspace_bytes,
        max_pending_strokes: config.limits.max_pending_strokes,
        steps_per_unit: config.canvas.path_steps_per_unit,
        save_debounce: Duration::from_millis(config.workspace.save_debounce_ms),
        canvas_width: config.canvas.width,
        canvas_height: config.canvas.height,
    }
}

impl AppState {
    /// The user's workspace store: the active one when connected, loaded
    /// directly from disk otherwise.
    pub async fn user_store(&self, user_id: &str) -> Result<Arc<WorkspaceStore>, GatewayError> {
        if let Some(ws) = self.registry.get(user_id).await {
            return Ok(ws.store.clone());
        }
        WorkspaceStore::load_for_user(user_id, &self.config.workspace.root, store_options(&self.config))
            .await
            .map_err(GatewayError::internal)
    }
}
