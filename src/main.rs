// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! NewGamE Hub API Server
//!
//! Discord login, redeemable point codes and a community leaderboard.

use newgame_hub::{
    config::{Config, DatabaseBackend},
    db::{FirestoreDb, MemoryDb, Store},
    sessions::{spawn_expired_deletion, DocumentSessionStore, EXPIRED_SWEEP_INTERVAL},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        environment = ?config.environment,
        backend = ?config.database_backend,
        "Starting NewGamE Hub API"
    );

    let db: Arc<dyn Store> = match (config.database_backend, &config.gcp_project_id) {
        (DatabaseBackend::Firestore, Some(project_id)) => Arc::new(FirestoreDb::new(project_id).await?),
        (DatabaseBackend::Firestore, None) => {
            return Err("GCP_PROJECT_ID is required for the Firestore backend".into())
        }
        (DatabaseBackend::Memory, _) => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    if config.bootstrap_admin_ids.is_empty() {
        tracing::warn!("BOOTSTRAP_ADMIN_IDS is empty; no account can reach an admin role");
    }

    let _sweeper = spawn_expired_deletion(
        DocumentSessionStore::new(db.clone()),
        EXPIRED_SWEEP_INTERVAL,
    );

    let port = config.port;
    let state = Arc::new(AppState::new(config, db));

    // Build router
    let app = newgame_hub::routes::create_router(state)?;

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("newgame_hub=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
