// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Coordinated termination.
//!
//! Order: set the shutting-down flag (new connections are rejected and the
//! node's socket tasks close with "going away"), wait for the drain,
//! cancel registered background tasks with a bounded join, then run the
//! cleanup callbacks (registry shutdown, final saves).

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

type CleanupFn = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;
type ConnectionCounter = Box<dyn Fn() -> BoxFuture<'static, usize> + Send + Sync>;

pub struct ShutdownCoordinator {
    flag: watch::Sender<bool>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
    cleanups: StdMutex<Vec<CleanupFn>>,
    connection_counter: StdMutex<Option<ConnectionCounter>>,
    drain_timeout: Duration,
    shutdown_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(drain_timeout: Duration, shutdown_timeout: Duration) -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag,
            tasks: StdMutex::new(Vec::new()),
            cleanups: StdMutex::new(Vec::new()),
            connection_counter: StdMutex::new(None),
            drain_timeout,
            shutdown_timeout,
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.flag.borrow()
    }

    /// Receiver that flips to `true` when shutdown begins.  Socket tasks
    /// select on this to close with "going away".
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.flag.subscribe()
    }

    /// Register a background task to cancel during shutdown.
    pub fn register_task(&self, task: JoinHandle<()>) {
        self.tasks.lock().expect("task lock").push(task);
    }

    /// Register a callback to run after tasks are cancelled.
    pub fn add_cleanup(&self, cleanup: CleanupFn) {
        self.cleanups.lock().expect("cleanup lock").push(cleanup);
    }

    /// Provide the live-connection counter used by the drain wait.
    pub fn set_connection_counter(&self, counter: ConnectionCounter) {
        *self.connection_counter.lock().expect("counter lock") = Some(counter);
    }

    /// Signal shutdown without running the sequence (signal handlers call
    /// this; the serve loop runs [`Self::shutdown`] on exit).
    pub fn initiate(&self) {
        info!("graceful shutdown initiated");
        let _ = self.flag.send(true);
    }

    /// Execute the full shutdown sequence.
    pub async fn shutdown(&self) {
        info!("graceful shutdown started");
        let _ = self.flag.send(true);

        // Step 1: drain connections.
        self.drain_connections().await;

        // Step 2: cancel background tasks.
        self.cancel_tasks().await;

        // Step 3: cleanup callbacks.
        let cleanups = std::mem::take(&mut *self.cleanups.lock().expect("cleanup lock"));
        info!(count = cleanups.len(), "running cleanup callbacks");
        for cleanup in &cleanups {
            cleanup().await;
        }

        info!("graceful shutdown completed");
    }

    async fn drain_connections(&self) {
        let counter = self.connection_counter.lock().expect("counter lock").take();
        let Some(counter) = counter else {
            return;
        };
        let deadline = tokio::time::Instant::now() + self.drain_timeout;
        loop {
            let open = counter().await;
            if open == 0 {
                info!("all connections drained");
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(open, "connection drain timed out");
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn cancel_tasks(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().expect("task lock"));
        if tasks.is_empty() {
            return;
        }
        info!(count = tasks.len(), "cancelling background tasks");
        for task in &tasks {
            task.abort();
        }
        let join_all = async {
            for task in tasks {
                let _ = task.await;
            }
        };
        if tokio::time::timeout(self.shutdown_timeout, join_all).await.is_err() {
            warn!("task cancellation timed out");
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(10))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
