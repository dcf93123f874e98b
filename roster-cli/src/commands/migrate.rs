//! Migration commands (up, down, status)
//!
//! `serve` applies pending migrations on its own; these are for operators.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use roster_server::migrate::Migrator;
use roster_server::startup;

use super::DatabaseArgs;

#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub command: MigrateCommand,
}

#[derive(Subcommand, Debug)]
pub enum MigrateCommand {
    /// Apply all pending migrations
    Up(DatabaseArgs),
    /// Revert the most recently applied migrations
    Down {
        #[command(flatten)]
        database: DatabaseArgs,

        /// Number of migrations to revert
        #[arg(long, default_value_t = 1)]
        steps: usize,
    },
    /// List migrations with their applied time
    Status(DatabaseArgs),
}

pub async fn run(args: MigrateArgs) -> Result<()> {
    match args.command {
        MigrateCommand::Up(database) => up(&database).await,
        MigrateCommand::Down { database, steps } => down(&database, steps).await,
        MigrateCommand::Status(database) => status(&database).await,
    }
}

async fn up(database: &DatabaseArgs) -> Result<()> {
    let config = database.resolve()?;
    let migrator = Migrator::load(&config.migrations_dir)?;
    let pool = startup::connect(&config).await?;

    let report = migrator.apply(&pool).await.context("migration failed")?;
    if report.is_empty() {
        println!("No pending migrations");
    } else {
        println!("Applied {} migration(s): {:?}", report.versions.len(), report.versions);
    }
    Ok(())
}

async fn down(database: &DatabaseArgs, steps: usize) -> Result<()> {
    let config = database.resolve()?;
    let migrator = Migrator::load(&config.migrations_dir)?;
    let pool = startup::connect(&config).await?;

    let report = migrator
        .rollback(&pool, steps)
        .await
        .context("rollback failed")?;
    if report.is_empty() {
        println!("Nothing to revert");
    } else {
        println!("Reverted {} migration(s): {:?}", report.versions.len(), report.versions);
    }
    Ok(())
}

async fn status(database: &DatabaseArgs) -> Result<()> {
    let config = database.resolve()?;
    let migrator = Migrator::load(&config.migrations_dir)?;
    let pool = startup::connect(&config).await?;

    for entry in migrator.status(&pool).await? {
        let applied = entry
            .applied_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "pending".to_string());
        println!("{:>6}  {:<25}  {}", entry.version, applied, entry.label);
    }
    Ok(())
}
