//! # STO CRM Server
//!
//! HTTP server for the order form.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CRM Server Startup                               │
//! │                                                                         │
//! │  ServerConfig (env) ──► ErpConfig (erp.toml + env) ──► sto_erp::connect │
//! │                                                        │                │
//! │                                                        ▼                │
//! │             AppState { catalog, submission, records, sessions }         │
//! │                                                        │                │
//! │                                   idle sweep task ◄────┤                │
//! │                                                        ▼                │
//! │                               axum::serve (graceful shutdown)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use sto_crm_server::{app, init_tracing, AppState, ServerConfig, SessionStore};
use sto_erp::ErpConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting STO CRM server...");

    // Load configuration
    let config = ServerConfig::from_env()?;
    let erp_config = ErpConfig::load(config.erp_config_path.clone())
        .context("Failed to load ERP configuration")?;
    info!(
        addr = %config.bind_address(),
        odata = %erp_config.odata.url,
        "Configuration loaded"
    );

    // ERP adapters share one HTTP client
    let ports = sto_erp::connect(&erp_config)?;
    let sessions = SessionStore::with_capacity(config.max_sessions);
    let sweeper = sessions.spawn_sweeper(config.session_ttl);
    info!(
        ttl_secs = config.session_ttl.as_secs(),
        max_sessions = config.max_sessions,
        "Session eviction enabled"
    );
    let state = AppState::new(
        Arc::new(ports.catalog),
        Arc::new(ports.submission),
        Arc::new(ports.records),
    )
    .with_search_limit(erp_config.odata.search_limit)
    .with_sessions(sessions);

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address()))?;
    info!(addr = %config.bind_address(), "CRM server listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
