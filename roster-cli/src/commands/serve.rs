//! HTTP server command
//!
//! Connects, migrates, then serves `POST /users` until shutdown.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use super::DatabaseArgs;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Address to bind to
    #[arg(long, short = 'b', env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Bound on each database insert, in seconds
    #[arg(long, env = "INSERT_TIMEOUT_SECS", default_value_t = 5)]
    pub insert_timeout_secs: u64,

    /// Bound on each HTTP request, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = args
        .database
        .resolve()?
        .with_insert_timeout(Duration::from_secs(args.insert_timeout_secs))?
        .with_request_timeout(Duration::from_secs(args.request_timeout_secs))?;
    config.bind_addr = args.bind;

    tracing::info!(
        migrations_dir = %config.migrations_dir.display(),
        "Starting roster server on {}",
        config.bind_addr
    );

    // Blocks until shutdown
    roster_server::run(config).await.context("server failed")?;

    Ok(())
}
