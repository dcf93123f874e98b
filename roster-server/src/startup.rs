//! Startup lifecycle
//!
//! Ordered, fail-fast initialisation: config check → pool → ping → migrations → bind →
//! serve. Each step returns on the first error and the listener is only
//! bound after every migration has committed.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::db::{self, UserRepo};
use crate::error::{Result, StartupError};
use crate::http::{run_server, AppState};
use crate::migrate;

/// Run the service until shutdown.
pub async fn run(config: ServerConfig) -> Result<()> {
    config.validate()?;
    let pool = connect(&config).await?;

    let report = migrate::apply(&pool, &config.migrations_dir).await?;
    tracing::info!(applied = report.versions.len(), "Schema ready");

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: config.bind_addr,
            source,
        })?;

    let state = AppState::new(Arc::new(UserRepo::new(pool)), config.insert_timeout);
    run_server(listener, state, config.request_timeout).await
}

/// Open the pool and confirm the database answers.
pub async fn connect(config: &ServerConfig) -> Result<PgPool> {
    tracing::info!(
        host = %config.database.connect_options.get_host(),
        database = ?config.database.connect_options.get_database(),
        max_connections = config.database.max_connections,
        "Connecting to database"
    );

    let pool = db::create_pool(&config.database)
        .await
        .map_err(StartupError::Connect)?;

    db::ping(&pool, config.insert_timeout)
        .await
        .map_err(StartupError::Ping)?;

    Ok(pool)
}
