// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Lifecycle of active workspaces.
//!
//! Workspaces activate lazily on the first connection (or REST access),
//! deactivate after a grace period with no connections, and are all torn
//! down on shutdown.  Activation uses a double-checked loading set so the
//! registry lock is never held across filesystem I/O.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use atelier_config::Config;
use atelier_session::AgentSession;
use atelier_state::{StoreOptions, WorkspaceStore};
use atelier_tools::{drawing_registry, ImageProvider, SandboxSettings};
use atelier_types::{AgentStatus, PauseReason, ServerMessage};

use crate::connections::ConnectionSet;
use crate::orchestrator::{Orchestrator, OrchestratorConfig, ToolDeps};
use crate::ConnectionId;

/// Builds a fresh agent session for one workspace.
pub type SessionFactory = Arc<dyn Fn(&str) -> Arc<dyn AgentSession> + Send + Sync>;

/// Bundle of components for one active user workspace.
pub struct ActiveWorkspace {
    pub user_id: String,
    pub store: Arc<WorkspaceStore>,
    pub connections: Arc<ConnectionSet>,
    pub orchestrator: Arc<Orchestrator>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
    idle_task: Mutex<Option<JoinHandle<()>>>,
}

impl ActiveWorkspace {
    /// Start (or restart) the orchestrator loop task.
    pub async fn start_agent_loop(&self) {
        let mut slot = self.loop_task.lock().await;
        if let Some(task) = slot.as_ref() {
            if !task.is_finished() {
                return;
            }
            warn!(user = %self.user_id, "agent loop task exited, restarting");
        }
        let orchestrator = Arc::clone(&self.orchestrator);
        *slot = Some(tokio::spawn(orchestrator.run_loop()));
        info!(user = %self.user_id, "agent loop started");
    }

    pub async fn stop_agent_loop(&self) {
        if let Some(task) = self.loop_task.lock().await.take() {
            task.abort();
            let _ = task.await;
            info!(user = %self.user_id, "agent loop stopped");
        }
    }

    async fn cancel_idle_timer(&self) {
        if let Some(task) = self.idle_task.lock().await.take() {
            task.abort();
        }
    }

    /// Post-connect sequence for a freshly added connection: send the
    /// `init` snapshot, auto-resume after a disconnect-pause, and re-notify
    /// about pending strokes so a reconnecting client fetches them.
    pub async fn on_client_connected(&self, conn: ConnectionId) -> anyhow::Result<()> {
        // Auto-resume first so the init snapshot reflects the resumed
        // state.  Only a disconnect-pause resumes; a user-requested pause
        // survives reconnects.
        let mut resumed = false;
        if self.store.status().await == AgentStatus::Paused
            && self.store.pause_reason().await == PauseReason::Disconnect
        {
            self.store
                .set_pause(AgentStatus::Idle, PauseReason::None)
                .await?;
            resumed = true;
            info!(user = %self.user_id, "agent auto-resumed (client reconnected)");
        }

        let snapshot = self.store.snapshot().await;
        let gallery = self.store.list_gallery().await?;
        let paused = snapshot.status == AgentStatus::Paused;
        self.connections.send_to(
            conn,
            &ServerMessage::Init {
                strokes: snapshot.canvas.strokes.clone(),
                gallery,
                status: snapshot.status,
                paused,
                piece_number: snapshot.piece_number,
                monologue: snapshot.monologue.clone(),
                drawing_style: snapshot.canvas.drawing_style,
                style_config: atelier_types::style_config(snapshot.canvas.drawing_style),
            },
        );

        if resumed {
            self.connections.broadcast(&ServerMessage::Paused {
                paused: false,
                reason: None,
            });
            self.orchestrator.wake();
        }

        // Paused canvases must not trigger animation on reconnect.
        if snapshot.pending_count > 0 && !paused {
            self.connections.send_to(
                conn,
                &ServerMessage::AgentStrokesReady {
                    count: snapshot.pending_count,
                    batch_id: snapshot.stroke_batch_id,
                    piece_number: snapshot.piece_number,
                },
            );
        }
        Ok(())
    }
}

struct Inner {
    workspaces: HashMap<String, Arc<ActiveWorkspace>>,
    loading: HashSet<String>,
}

/// Manages active workspaces for all users.
pub struct WorkspaceRegistry {
    config: Arc<Config>,
    session_factory: SessionFactory,
    image_provider: Option<Arc<dyn ImageProvider>>,
    inner: Mutex<Inner>,
}

impl WorkspaceRegistry {
    pub fn new(
        config: Arc<Config>,
        session_factory: SessionFactory,
        image_provider: Option<Arc<dyn ImageProvider>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            session_factory,
            image_provider,
            inner: Mutex::new(Inner {
                workspaces: HashMap::new(),
                loading: HashSet::new(),
            }),
        })
    }

    /// Get an existing workspace or activate a new one.
    ///
    /// The registry lock is released while the workspace loads; concurrent
    /// callers for the same user wait for the loader and retry.
    pub async fn get_or_activate(
        self: &Arc<Self>,
        user_id: &str,
    ) -> anyhow::Result<Arc<ActiveWorkspace>> {
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(ws) = inner.workspaces.get(user_id).cloned() {
                    drop(inner);
                    ws.cancel_idle_timer().await;
                    ws.start_agent_loop().await;
                    return Ok(ws);
                }
                if !inner.loading.contains(user_id) {
                    inner.loading.insert(user_id.to_string());
                    break;
                }
            }
            // Another task is loading this workspace; wait and retry.
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let activated = self.activate_workspace(user_id).await;
        let mut inner = self.inner.lock().await;
        inner.loading.remove(user_id);
        match activated {
            Ok(ws) => {
                inner.workspaces.insert(user_id.to_string(), Arc::clone(&ws));
                drop(inner);
                ws.start_agent_loop().await;
                Ok(ws)
            }
            Err(e) => Err(e),
        }
    }

    async fn activate_workspace(&self, user_id: &str) -> anyhow::Result<Arc<ActiveWorkspace>> {
        info!(user = %user_id, "activating workspace");
        let cfg = &self.config;

        let store = WorkspaceStore::load_for_user(
            user_id,
            &cfg.workspace.root,
            StoreOptions {
                max_workspace_bytes: cfg.workspace.max_workspace_bytes,
                max_pending_strokes: cfg.limits.max_pending_strokes,
                steps_per_unit: cfg.canvas.path_steps_per_unit,
                save_debounce: Duration::from_millis(cfg.workspace.save_debounce_ms),
                canvas_width: cfg.canvas.width,
                canvas_height: cfg.canvas.height,
            },
        )
        .await?;

        let connections = Arc::new(ConnectionSet::new(
            user_id,
            cfg.limits.max_connections_per_user,
        ));
        let session = (self.session_factory)(user_id);
        let orchestrator = Orchestrator::new(
            Arc::clone(&store),
            Arc::clone(&connections),
            session,
            drawing_registry(),
            OrchestratorConfig::from_agent_config(&cfg.agent),
            ToolDeps {
                canvas_width: cfg.canvas.width,
                canvas_height: cfg.canvas.height,
                image_provider: self.image_provider.clone(),
                image_timeout: Duration::from_secs(cfg.agent.image_gen_timeout_s),
                sandbox: SandboxSettings {
                    python_bin: cfg.sandbox.python_bin.clone(),
                    timeout: Duration::from_secs(cfg.sandbox.python_timeout_s),
                },
            },
        );

        Ok(Arc::new(ActiveWorkspace {
            user_id: user_id.to_string(),
            store,
            connections,
            orchestrator,
            loop_task: Mutex::new(None),
            idle_task: Mutex::new(None),
        }))
    }

    /// Handle a dropped connection: pause on last disconnect and schedule
    /// deferred deactivation.
    pub async fn on_disconnect(self: &Arc<Self>, user_id: &str, conn: ConnectionId) {
        let ws = {
            let inner = self.inner.lock().await;
            match inner.workspaces.get(user_id) {
                Some(ws) => Arc::clone(ws),
                None => return,
            }
        };

        ws.connections.remove(conn);
        if !ws.connections.is_empty() {
            return;
        }

        // Pause with reason = disconnect — unless already paused, in which
        // case the existing reason (e.g. user) is preserved.
        if ws.store.status().await != AgentStatus::Paused {
            if let Err(e) = ws
                .store
                .set_pause(AgentStatus::Paused, PauseReason::Disconnect)
                .await
            {
                warn!(user = %user_id, "failed to persist disconnect pause: {e}");
            }
            ws.connections.broadcast(&ServerMessage::Status {
                status: AgentStatus::Paused,
            });
            ws.connections.broadcast(&ServerMessage::Paused {
                paused: true,
                reason: Some(PauseReason::Disconnect),
            });
            info!(user = %user_id, "agent paused (last client disconnected)");
        }

        let registry = Arc::clone(self);
        let user = user_id.to_string();
        let grace = Duration::from_secs(self.config.workspace.idle_grace_period_s);
        *ws.idle_task.lock().await = Some(tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            registry.deactivate_if_idle(&user).await;
        }));
    }

    async fn deactivate_if_idle(self: &Arc<Self>, user_id: &str) {
        let ws = {
            let inner = self.inner.lock().await;
            match inner.workspaces.get(user_id) {
                Some(ws) => Arc::clone(ws),
                None => return,
            }
        };
        if ws.connections.is_empty() {
            self.deactivate(user_id).await;
        }
    }

    async fn deactivate(self: &Arc<Self>, user_id: &str) {
        let ws = {
            let mut inner = self.inner.lock().await;
            match inner.workspaces.remove(user_id) {
                Some(ws) => ws,
                None => return,
            }
        };
        info!(user = %user_id, "deactivating workspace");
        ws.stop_agent_loop().await;
        ws.orchestrator.reset_session().await;
        if let Err(e) = ws.store.save().await {
            warn!(user = %user_id, "final save failed: {e}");
        }
    }

    /// Deactivate every workspace (server shutdown).
    pub async fn shutdown_all(self: &Arc<Self>) {
        let user_ids: Vec<String> = {
            let inner = self.inner.lock().await;
            inner.workspaces.keys().cloned().collect()
        };
        for user_id in user_ids {
            self.deactivate(&user_id).await;
        }
        info!("all workspaces deactivated");
    }

    /// Look up an active workspace without activating.
    pub async fn get(&self, user_id: &str) -> Option<Arc<ActiveWorkspace>> {
        self.inner.lock().await.workspaces.get(user_id).cloned()
    }

    pub async fn active_count(&self) -> usize {
        self.inner.lock().await.workspaces.len()
    }

    /// Total open connections across all workspaces (shutdown drain).
    pub async fn total_connections(&self) -> usize {
        let inner = self.inner.lock().await;
        inner
            .workspaces
            .values()
            .map(|ws| ws.connections.connection_count())
            .sum()
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }
}
