//! Authentica Server - REST API for product trust verification
//!
//! Wires the ledger client and scan store from the environment, builds the
//! router, and serves until interrupted.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use authentica_core::{HttpLedger, MemoryScanStore, MockLedger, ScanStore, TrustLedger};
use authentica_server::db::PgScanStore;
use authentica_server::{create_router, AppState, Config};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::from_env();

    let ledger: Arc<dyn TrustLedger> = match config.ledger_http_config() {
        Some(ledger_config) => {
            tracing::info!(url = %ledger_config.base_url, "Using HTTP ledger gateway");
            match HttpLedger::new(ledger_config) {
                Ok(client) => Arc::new(client),
                Err(err) => {
                    tracing::error!(error = %err, "Failed to create ledger client");
                    std::process::exit(1);
                }
            }
        }
        None => {
            tracing::warn!(
                "LEDGER_URL not set; using an empty in-memory registry \
                 (every product resolves to not-found)"
            );
            Arc::new(MockLedger::new())
        }
    };

    let store: Arc<dyn ScanStore> = match &config.database_url {
        Some(url) => {
            match PgScanStore::connect(
                url,
                config.database_max_connections,
                config.database_min_connections,
            )
            .await
            {
                Ok(store) => {
                    tracing::info!("Using Postgres scan store");
                    Arc::new(store)
                }
                Err(err) => {
                    tracing::error!(error = %err, "Failed to connect scan store");
                    std::process::exit(1);
                }
            }
        }
        None => {
            tracing::warn!("DATABASE_URL not set; scan events are held in memory only");
            Arc::new(MemoryScanStore::new())
        }
    };

    let state = AppState::new(ledger, store, config.detector.clone());
    let app = create_router(&config, state);

    let addr = config.socket_addr();
    tracing::info!(%addr, "Authentica server listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install shutdown handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
