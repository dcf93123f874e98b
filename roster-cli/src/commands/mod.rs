//! Command implementations for the roster CLI

pub mod migrate;
pub mod serve;

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use roster_server::config::DEFAULT_MAX_CONNECTIONS;
use roster_server::ServerConfig;

/// Database and migration inputs shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// PostgreSQL connection URI
    #[arg(long, env = "DB_URI", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Directory containing <version>_<name>.sql migration files
    #[arg(long, env = "MIGRATIONS_DIR")]
    pub migrations_dir: Option<PathBuf>,

    /// Maximum pooled database connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,
}

impl DatabaseArgs {
    /// Validate the inputs; nothing is connected yet.
    pub fn resolve(&self) -> Result<ServerConfig> {
        let config = ServerConfig::resolve(
            self.database_url.as_deref(),
            self.migrations_dir.as_deref(),
        )?
        .with_max_connections(self.max_connections)?;
        Ok(config)
    }
}
