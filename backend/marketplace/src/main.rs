//! Bidding marketplace backend — entry point.
//!
//! Sellers post projects, buyers place bids on them, and the lowest bid wins.
//! Records are kept in a document store (SQLite by default) and exposed through
//! a small Axum REST API.

mod api;
mod bidding;
mod config;
mod db;
mod errors;
mod memory;
mod models;
mod projects;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Config, StoreBackend};
use db::{DocumentStore, SqliteStore};
use memory::InMemoryStore;
use projects::ProjectManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting marketplace backend...");

    // Configuration problems abort startup.
    let config = Config::load().map_err(|e| anyhow::anyhow!("{e}"))?;

    let documents: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Sqlite => {
            let pool = db::init_pool(&config.database_url).await?;
            Arc::new(SqliteStore::new(pool, config.db_timeout()))
        }
        StoreBackend::Memory => {
            info!("Using in-memory document store; data is lost on exit");
            Arc::new(InMemoryStore::new())
        }
    };

    let projects = Arc::new(ProjectManager::new(
        documents,
        config.databases.clone(),
        config.fetch_limit,
    ));
    let app = api::router(Arc::new(api::ApiState::new(projects)));

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Application stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shut down signal received");
}
