mod models;
mod handlers;
mod services;
mod middleware;
mod config;
mod errors;
mod routes;
mod state;
mod validation;

use std::sync::Arc;

use anyhow::Context;
use crate::{
    config::{Config, StorageBackend},
    services::{MemoryStore, RedisStore, TaskStore, UserStore},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize basic tracing subscriber
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Pick the persistence backend
    let (users, tasks): (Arc<dyn UserStore>, Arc<dyn TaskStore>) = match config.storage.backend {
        StorageBackend::Redis => {
            let client = redis::Client::open(config.redis.connection_url()?)
                .context("Failed to create Redis client")?;
            let store = Arc::new(RedisStore::new(Arc::new(client)));
            (store.clone(), store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        }
    };

    // Signing key, TTL and hashing cost are fixed from here on
    let state = AppState::new(&config.auth, users, tasks);
    let app = routes::router(state, config.server.max_body_size);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind server to {}", address))?;
    tracing::info!("Server running on {}", address);

    axum::serve(listener, app.into_make_service())
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
