//! Tote Server - per-user document store for carts and wishlists.
//!
//! Each signed-in shopper owns one JSON document. tote-engine clients read it
//! whole and patch the `cart` and `wishlist` fields, which are merged into
//! the stored document at the top level.

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod routes;

use crate::config::Config;
use crate::db::Pool;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shared by every request: the document pool and the settings that decide
/// whether bearer tokens are checked.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub config: Arc<Config>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tote_server=debug,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, draining open requests");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = Arc::new(Config::from_env()?);
    match &config.auth_secret {
        Some(_) => tracing::info!("Document access requires <user>.<secret> bearer tokens"),
        None => tracing::warn!("AUTH_SECRET not set, documents are open to anonymous access"),
    }

    let pool = db::create_pool(&config.database_url, config.max_connections).await?;
    db::run_migrations(&pool).await?;
    tracing::info!(max_connections = config.max_connections, "Documents table ready");

    let app = routes::create_app(AppState {
        pool,
        config: Arc::clone(&config),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "Serving user documents");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
