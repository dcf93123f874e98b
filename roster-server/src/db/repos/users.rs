//! User repository
//!
//! One operation: a plain INSERT. No existence check and no ON CONFLICT;
//! duplicate usernames and emails are accepted.

use async_trait::async_trait;
use sqlx::{Connection, PgPool};

use crate::models::NewUser;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("expected 1 row inserted, got {0}")]
    RowCount(u64),
}

/// Persistent user storage shared by every request
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert exactly one user; the store assigns `id` and `created_at`.
    async fn insert(&self, user: &NewUser) -> Result<(), DbError>;

    /// Cheap liveness check used by `/health`
    async fn ping(&self) -> Result<(), DbError>;
}

/// PostgreSQL-backed user store
#[derive(Debug, Clone)]
pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepo {
    async fn insert(&self, user: &NewUser) -> Result<(), DbError> {
        let result = sqlx::query("INSERT INTO users (username, email) VALUES ($1, $2)")
            .bind(user.username())
            .bind(user.email())
            .execute(&self.pool)
            .await?;

        match result.rows_affected() {
            1 => Ok(()),
            n => Err(DbError::RowCount(n)),
        }
    }

    async fn ping(&self) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }
}
