//! # parley-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the Parley API.
//! Binds to a configurable port (default 8080).

use std::sync::Arc;

use parley_api::db::PgLedger;
use parley_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(?config, "configuration loaded");

    // Absent DATABASE_URL means the in-memory ledger.
    let db_pool = parley_api::db::init_pool(config.database_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("Database initialization failed: {e}");
            e
        })?;

    let port = config.port;
    let metrics_enabled = config.metrics_enabled;
    let mut state = match db_pool {
        Some(pool) => AppState::with_store(config, Arc::new(PgLedger::new(pool))),
        None => AppState::with_config(config),
    };

    if metrics_enabled {
        let handle = parley_api::middleware::metrics::install_recorder().map_err(|e| {
            tracing::error!("Prometheus recorder installation failed: {e}");
            e
        })?;
        state = state.with_metrics(handle);
    }

    let backend = state.gateway.engine().store().backend_name();
    let app = parley_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, backend, "Parley API listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
