// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use atelier_core::{Dispatcher, SessionFactory, ShutdownCoordinator, WorkspaceRegistry};
use atelier_node::{AppState, StaticTokenValidator, StaticUserDirectory};
use atelier_session::{AgentSession, ScriptedSession};
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = atelier_config::load(cli.config.as_deref()).context("loading config")?;

    match cli.command {
        Some(Commands::ShowConfig) => {
            println!("{}", serde_yaml::to_string(&config).unwrap_or_default());
            Ok(())
        }
        Some(Commands::Serve { listen }) => {
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            run_server(config).await
        }
        None => run_server(config).await,
    }
}

async fn run_server(config: atelier_config::Config) -> anyhow::Result<()> {
    let config = Arc::new(config);

    // The LLM transport is an external adapter.  Without one wired in,
    // sessions come up scripted-empty: the loop runs and turns no-op.
    let session_factory: SessionFactory =
        Arc::new(|_user: &str| -> Arc<dyn AgentSession> { Arc::new(ScriptedSession::new(vec![])) });

    let image_provider = config.agent.image_endpoint.clone().map(|endpoint| {
        let provider = atelier_tools::HttpImageProvider::new(
            endpoint,
            config.agent.image_api_key_env.as_deref(),
        );
        Arc::new(provider) as Arc<dyn atelier_tools::ImageProvider>
    });

    let registry = WorkspaceRegistry::new(Arc::clone(&config), session_factory, image_provider);
    let dispatcher = Arc::new(Dispatcher::new(config.limits.max_strokes_per_minute));
    let shutdown = Arc::new(ShutdownCoordinator::new(
        Duration::from_secs_f64(config.server.drain_timeout_s),
        Duration::from_secs_f64(config.server.shutdown_timeout_s),
    ));

    // Drain waits on the live connection count; cleanup saves every
    // workspace.
    {
        let registry = Arc::clone(&registry);
        shutdown.set_connection_counter(Box::new(move || {
            let registry = Arc::clone(&registry);
            Box::pin(async move { registry.total_connections().await })
        }));
    }
    {
        let registry = Arc::clone(&registry);
        shutdown.add_cleanup(Box::new(move || {
            let registry = Arc::clone(&registry);
            Box::pin(async move { registry.shutdown_all().await })
        }));
    }

    install_signal_handlers(Arc::clone(&shutdown));

    let app = AppState {
        config: Arc::clone(&config),
        registry,
        dispatcher,
        shutdown,
        validator: Arc::new(StaticTokenValidator::new(config.server.dev_tokens.clone())),
        users: Arc::new(StaticUserDirectory::new(
            config.server.public_gallery_users.clone(),
        )),
    };

    atelier_node::serve(app).await
}

/// SIGTERM / SIGINT flip the shutdown flag; the serve loop runs the rest.
fn install_signal_handlers(shutdown: Arc<ShutdownCoordinator>) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("failed to install SIGTERM handler: {e}");
                        let _ = ctrl_c.await;
                        shutdown.initiate();
                        return;
                    }
                };
            tokio::select! {
                _ = ctrl_c => info!("received SIGINT"),
                _ = sigterm.recv() => info!("received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received ctrl-c");
        }
        shutdown.initiate();
    });
}

/// Tracing to stderr with EnvFilter; ATELIER_LOG_FILE redirects to a file.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if let Ok(path) = std::env::var("ATELIER_LOG_FILE") {
        if let Ok(file) = std::fs::File::options().create(true).append(true).open(&path) {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
                .init();
            return;
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
