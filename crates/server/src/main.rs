mod api;
mod auth;
mod bootstrap;
mod health;
#[cfg(test)]
mod testutil;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Notify;

use grantline_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use grantline_core::config::LogFormat::*;
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

    // Bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    let bind = format!("{}:{}", app.state.config.server.bind_address, app.state.config.server.port);
    let drain_deadline = Duration::from_secs(app.state.config.server.graceful_shutdown_secs);

    let router = api::router(app.state.clone()).merge(health::router(app.db_pool.clone()));
    let listener = tokio::net::TcpListener::bind(&bind).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %bind,
        "grantline-server started"
    );

    let shutdown = Arc::new(Notify::new());
    let server = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.notified().await })
                .await
        })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "grantline-server stopping"
    );
    shutdown.notify_one();

    // Bound the drain of in-flight requests.
    match tokio::time::timeout(drain_deadline, server).await {
        Ok(joined) => joined??,
        Err(_) => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                "graceful shutdown deadline exceeded, exiting"
            );
        }
    }

    Ok(())
}
