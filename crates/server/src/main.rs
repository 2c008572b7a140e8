mod bootstrap;
mod chat;
mod health;
mod orders;
mod sessions;

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use scoopy_agent::TurnMemory;
use scoopy_core::config::{AppConfig, LoadOptions};

/// How often abandoned sessions' transient histories are swept, and how
/// long a session may sit idle before its history is dropped. Dropping
/// only loses conversational context; the token itself stays usable.
const MEMORY_SWEEP_INTERVAL: Duration = Duration::from_secs(300);
const MEMORY_IDLE_LIMIT: Duration = Duration::from_secs(1800);

fn init_logging(config: &AppConfig) {
    use scoopy_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    info!(
        event_name = "system.server.notifier_mode",
        notifier_mode = if app.notifier_is_noop { "noop" } else { "pushover" },
        "notifier initialized"
    );

    spawn_memory_sweeper(app.sessions.memory().clone());

    let state = chat::ChatState { sessions: app.sessions.clone(), runtime: app.runtime.clone() };
    let router = chat::router(state, chat::cors_layer(&app.config.server))
        .merge(health::router(app.db_pool.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        event_name = "system.server.started",
        bind_address = %address,
        "scoopy-server listening"
    );

    // Signal the drain watchdog once shutdown actually begins; open
    // connections then get a bounded window to finish.
    let drain_limit = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let (drain_tx, drain_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!(event_name = "system.server.stopping", "shutdown signal received");
        let _ = drain_tx.send(());
    });

    tokio::select! {
        result = server => {
            result?;
        }
        _ = async {
            let _ = drain_rx.await;
            tokio::time::sleep(drain_limit).await;
        } => {
            warn!(
                event_name = "system.server.drain_timeout",
                timeout_secs = drain_limit.as_secs(),
                "open connections did not drain in time; exiting"
            );
        }
    }

    info!(event_name = "system.server.stopped", "scoopy-server stopped");
    Ok(())
}

fn spawn_memory_sweeper(memory: TurnMemory) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(MEMORY_SWEEP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = memory.evict_idle(MEMORY_IDLE_LIMIT).await;
            if evicted > 0 {
                info!(
                    event_name = "session.memory_evicted",
                    evicted,
                    "dropped transient histories of idle sessions"
                );
            }
        }
    });
}
