//! Drip - Campaign service entry point

use anyhow::{bail, Result};
use drip_api::{create_router, AppState};
use drip_common::config::{Config, LoggingConfig};
use drip_core::bootstrap::{ensure_admin, ensure_settings};
use drip_core::{SmtpMailer, TokenIssuer};
use drip_storage::{DatabasePool, Store};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting drip campaign service on {}...", config.server.hostname);

    // Open the store
    let store = match config.database.backend.as_str() {
        "postgres" => {
            let db_pool = DatabasePool::new(&config.database).await?;
            db_pool.migrate().await?;
            Store::postgres(db_pool)
        }
        "memory" => {
            warn!("Using the in-memory store, data will not survive a restart");
            Store::memory()
        }
        other => bail!("Unknown database backend: {}", other),
    };

    // Seed the admin account and settings row
    ensure_admin(&store, &config.auth).await?;
    ensure_settings(&store).await?;

    if config.auth.uses_default_secret() {
        warn!("auth.jwt_secret is not set, tokens are signed with the built-in secret");
    }

    let state = Arc::new(AppState {
        store,
        tokens: TokenIssuer::from_config(&config.auth),
        mailer: Arc::new(SmtpMailer::new(&config.mailer)),
    });
    let app = create_router(state, &config.api);

    // Start API server
    let addr = config.api.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Starting API server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Drip campaign service shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
