//! roster CLI - user service entry point
//!
//! Provides:
//! - `serve`: validate config, connect, migrate, then serve `POST /users`
//! - `migrate`: operator commands to apply, revert or inspect migrations
//!
//! A `.env` file in the working directory is loaded first; variables that
//! are already set take precedence.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "roster",
    author,
    version,
    about = "User-creation HTTP service backed by PostgreSQL",
    long_about = "Applies pending schema migrations at startup, then serves POST /users. \
                  Fails fast when the database is unreachable or a migration fails."
)]
struct Cli {
    /// Enable debug logging (ignored when RUST_LOG is set)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations, then run the HTTP server
    Serve(commands::serve::ServeArgs),
    /// Manage schema migrations (up, down, status)
    Migrate(commands::migrate::MigrateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing so clap's env fallbacks see .env values
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_setup::init(&TracingConfig { debug: cli.debug })?;

    match cli.command {
        Commands::Serve(args) => commands::serve::run_serve(args).await?,
        Commands::Migrate(args) => commands::migrate::run(args).await?,
    }

    Ok(())
}
