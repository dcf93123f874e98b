//! Startup error types for roster-server
//!
//! Every variant is fatal: the binary logs it and exits non-zero.
//! Per-request failures live in `http::error::ApiError` instead.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::ConfigError;
use crate::migrate::MigrateError;

/// Errors that abort the startup sequence or the serve loop
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("database is unreachable: {0}")]
    Ping(#[source] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migrate(#[from] MigrateError),

    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Result type alias for startup operations
pub type Result<T> = std::result::Result<T, StartupError>;
