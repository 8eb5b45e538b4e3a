//! # trustavo-server
//!
//! HTTP/JSON front for a single Trustavo node.
//!
//! This binary provides:
//! - **REST API** (axum) over identities, signals, likes, comments and feeds
//! - **Demo seed** of two identities and their signals (`SEED_DEMO=true`)
//!
//! All state lives in memory and vanishes with the process, the same way
//! identities vanish after their 24 hours.

mod api;
mod config;
mod error;
mod seed;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use trustavo_store::Trustavo;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,trustavo_server=debug")),
        )
        .init();

    info!("Starting Trustavo server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize state
    // -----------------------------------------------------------------------
    let app = Arc::new(Trustavo::with_system_clock());

    if config.seed_demo {
        seed::seed_demo(&app)?;
    }

    let http_addr = config.http_addr;
    let app_state = AppState {
        app,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
