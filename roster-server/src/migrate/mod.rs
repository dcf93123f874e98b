//! File-based schema migrations
//!
//! Applied versions are recorded in `schema_migrations`. All work happens on
//! one pooled connection holding a session advisory lock, so two replicas
//! starting at once apply each script exactly once. Every script runs in its
//! own transaction unless it is annotated `NO TRANSACTION`, in which case its
//! statements are sent one by one with no transaction block around them.

mod error;
pub mod source;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{Connection, PgConnection, PgPool, Postgres};

pub use error::MigrateError;
pub use source::Migration;

/// Arbitrary constant shared by every roster process for `pg_advisory_lock`.
const MIGRATION_LOCK_ID: i64 = 0x726f_7374_6572;

const CREATE_TRACKING_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version BIGINT PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Apply every pending migration found in `dir`.
pub async fn apply(pool: &PgPool, dir: &Path) -> Result<MigrationReport, MigrateError> {
    Migrator::load(dir)?.apply(pool).await
}

/// Outcome of an `apply` or `rollback` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Versions applied (or reverted) by this run, in execution order
    pub versions: Vec<i64>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Applied state of one known migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i64,
    pub label: String,
    pub applied_at: Option<DateTime<Utc>>,
}

/// An ordered set of migrations loaded from a directory
#[derive(Debug, Clone)]
pub struct Migrator {
    migrations: Vec<Migration>,
}

impl Migrator {
    /// Discover and parse every migration in `dir`
    pub fn load(dir: &Path) -> Result<Self, MigrateError> {
        let migrations = source::discover(dir)?;
        tracing::debug!(dir = %dir.display(), count = migrations.len(), "Loaded migrations");
        Ok(Self { migrations })
    }

    /// Build from already parsed migrations (sorted, duplicates rejected)
    pub fn from_migrations(migrations: Vec<Migration>) -> Result<Self, MigrateError> {
        Ok(Self {
            migrations: source::sort_migrations(migrations)?,
        })
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Migrations not yet in `applied`, in application order
    pub fn pending<'a>(&'a self, applied: &BTreeSet<i64>) -> Vec<&'a Migration> {
        self.migrations
            .iter()
            .filter(|m| !applied.contains(&m.version))
            .collect()
    }

    /// Apply pending migrations in order, stopping at the first failure.
    pub async fn apply(&self, pool: &PgPool) -> Result<MigrationReport, MigrateError> {
        let mut conn = lock(pool).await?;
        let result = self.apply_locked(&mut conn).await;
        unlock(conn).await;
        result
    }

    /// Revert the `steps` most recently applied migrations, newest first.
    pub async fn rollback(
        &self,
        pool: &PgPool,
        steps: usize,
    ) -> Result<MigrationReport, MigrateError> {
        let mut conn = lock(pool).await?;
        let result = self.rollback_locked(&mut conn, steps).await;
        unlock(conn).await;
        result
    }

    /// Applied timestamp (or pending) for every migration on disk
    pub async fn status(&self, pool: &PgPool) -> Result<Vec<MigrationStatus>, MigrateError> {
        let mut conn = pool.acquire().await?;
        sqlx::query(CREATE_TRACKING_TABLE)
            .execute(&mut *conn)
            .await?;
        let applied = applied_versions(&mut conn).await?;

        Ok(self
            .migrations
            .iter()
            .map(|m| MigrationStatus {
                version: m.version,
                label: m.label(),
                applied_at: applied.get(&m.version).copied(),
            })
            .collect())
    }

    async fn apply_locked(&self, conn: &mut PgConnection) -> Result<MigrationReport, MigrateError> {
        sqlx::query(CREATE_TRACKING_TABLE).execute(&mut *conn).await?;

        let applied = applied_versions(conn).await?;
        self.warn_on_drift(&applied);

        let applied_set: BTreeSet<i64> = applied.keys().copied().collect();
        let highest_applied = applied_set.last().copied();
        let pending = self.pending(&applied_set);

        if pending.is_empty() {
            tracing::info!("Database schema is up to date");
            return Ok(MigrationReport::default());
        }

        let mut report = MigrationReport::default();
        for migration in pending {
            if highest_applied.is_some_and(|highest| migration.version < highest) {
                tracing::warn!(
                    version = migration.version,
                    "Applying migration older than the newest applied version"
                );
            }

            run_up(conn, migration).await?;
            tracing::info!(
                version = migration.version,
                migration = %migration.label(),
                "Applied migration"
            );
            report.versions.push(migration.version);
        }

        tracing::info!(count = report.versions.len(), "Migrations complete");
        Ok(report)
    }

    async fn rollback_locked(
        &self,
        conn: &mut PgConnection,
        steps: usize,
    ) -> Result<MigrationReport, MigrateError> {
        sqlx::query(CREATE_TRACKING_TABLE).execute(&mut *conn).await?;

        let applied = applied_versions(conn).await?;
        let by_version: BTreeMap<i64, &Migration> =
            self.migrations.iter().map(|m| (m.version, m)).collect();

        let mut report = MigrationReport::default();
        for version in applied.keys().rev().take(steps) {
            let migration = by_version
                .get(version)
                .ok_or(MigrateError::MissingSource { version: *version })?;

            run_down(conn, migration).await?;
            tracing::info!(
                version = migration.version,
                migration = %migration.label(),
                "Reverted migration"
            );
            report.versions.push(migration.version);
        }

        if report.is_empty() {
            tracing::info!("No applied migrations to revert");
        }
        Ok(report)
    }

    fn warn_on_drift(&self, applied: &BTreeMap<i64, DateTime<Utc>>) {
        let known: BTreeSet<i64> = self.migrations.iter().map(|m| m.version).collect();
        for version in applied.keys().filter(|v| !known.contains(v)) {
            tracing::warn!(
                version,
                "Applied migration has no matching file in the migrations directory"
            );
        }
    }
}

async fn lock(pool: &PgPool) -> Result<PoolConnection<Postgres>, MigrateError> {
    let mut conn = pool.acquire().await?;
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&mut *conn)
        .await?;
    Ok(conn)
}

async fn unlock(mut conn: PoolConnection<Postgres>) {
    // The lock is session scoped: if it cannot be released, the connection
    // must not go back to the pool still holding it.
    if let Err(e) = sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&mut *conn)
        .await
    {
        tracing::warn!(error = %e, "Failed to release migration lock, closing connection");
        conn.close_on_drop();
    }
}

async fn applied_versions(
    conn: &mut PgConnection,
) -> Result<BTreeMap<i64, DateTime<Utc>>, MigrateError> {
    let rows: Vec<(i64, DateTime<Utc>)> =
        sqlx::query_as("SELECT version, applied_at FROM schema_migrations ORDER BY version")
            .fetch_all(&mut *conn)
            .await?;
    Ok(rows.into_iter().collect())
}

async fn run_up(conn: &mut PgConnection, migration: &Migration) -> Result<(), MigrateError> {
    let apply_err = |source| MigrateError::Apply {
        version: migration.version,
        name: migration.label(),
        source,
    };

    if migration.no_transaction {
        execute_statements(&mut *conn, &migration.up).await.map_err(apply_err)?;
        record(&mut *conn, migration).await.map_err(apply_err)?;
        return Ok(());
    }

    let mut tx = conn.begin().await.map_err(apply_err)?;
    execute_statements(&mut *tx, &migration.up).await.map_err(apply_err)?;
    record(&mut *tx, migration).await.map_err(apply_err)?;
    tx.commit().await.map_err(apply_err)
}

async fn run_down(conn: &mut PgConnection, migration: &Migration) -> Result<(), MigrateError> {
    if migration.down.is_empty() {
        return Err(MigrateError::NoDownSection {
            version: migration.version,
            name: migration.label(),
        });
    }

    let revert_err = |source| MigrateError::Revert {
        version: migration.version,
        name: migration.label(),
        source,
    };

    if migration.no_transaction {
        execute_statements(&mut *conn, &migration.down).await.map_err(revert_err)?;
        forget(&mut *conn, migration.version).await.map_err(revert_err)?;
        return Ok(());
    }

    let mut tx = conn.begin().await.map_err(revert_err)?;
    execute_statements(&mut *tx, &migration.down).await.map_err(revert_err)?;
    forget(&mut *tx, migration.version).await.map_err(revert_err)?;
    tx.commit().await.map_err(revert_err)
}

/// Send each statement as its own simple query. A multi-statement message
/// would run as an implicit transaction block, which `NO TRANSACTION`
/// scripts cannot allow.
async fn execute_statements(
    conn: &mut PgConnection,
    statements: &[String],
) -> Result<(), sqlx::Error> {
    for statement in statements {
        sqlx::raw_sql(statement).execute(&mut *conn).await?;
    }
    Ok(())
}

async fn record(conn: &mut PgConnection, migration: &Migration) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO schema_migrations (version, name) VALUES ($1, $2)")
        .bind(migration.version)
        .bind(&migration.name)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn forget(conn: &mut PgConnection, version: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM schema_migrations WHERE version = $1")
        .bind(version)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn migration(version: i64) -> Migration {
        Migration {
            version,
            name: format!("m{version}"),
            path: PathBuf::from(format!("{version:03}_m{version}.sql")),
            up: vec![format!("SELECT {version};")],
            down: Vec::new(),
            no_transaction: false,
        }
    }

    #[test]
    fn from_migrations_sorts_by_version() {
        let migrator =
            Migrator::from_migrations(vec![migration(3), migration(1), migration(2)]).unwrap();
        let versions: Vec<i64> = migrator.migrations().iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn pending_skips_applied_and_keeps_order() {
        let migrator =
            Migrator::from_migrations(vec![migration(1), migration(2), migration(3)]).unwrap();

        let applied = BTreeSet::from([2]);
        let pending: Vec<i64> = migrator.pending(&applied).iter().map(|m| m.version).collect();
        assert_eq!(pending, vec![1, 3]);

        let all = BTreeSet::from([1, 2, 3]);
        assert!(migrator.pending(&all).is_empty());
    }

    #[test]
    fn label_uses_file_stem() {
        assert_eq!(migration(7).label(), "007_m7");
    }
}
