//! Database connection pool management
//!
//! Uses sqlx PgPool with an explicit connection limit. `acquire_timeout`
//! bounds how long a caller waits for a connection when the database is
//! slow or unreachable.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgPool};

use crate::config::DatabaseConfig;

/// Create a PostgreSQL connection pool.
///
/// Opens one connection eagerly, so an unreachable database fails here
/// rather than on the first request.
///
/// # Example
///
/// ```ignore
/// let config = DatabaseConfig::from_url("postgres://localhost/roster")?;
/// let pool = create_pool(&config).await?;
/// ```
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(config.connect_options.clone())
        .await
}

/// Round-trip a ping on a pooled connection, bounded by `timeout`.
pub async fn ping(pool: &PgPool, timeout: Duration) -> Result<(), sqlx::Error> {
    let check = async {
        let mut conn = pool.acquire().await?;
        conn.ping().await
    };

    tokio::time::timeout(timeout, check)
        .await
        .map_err(|_| sqlx::Error::PoolTimedOut)?
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests require a real database
    // Run with: DATABASE_URL=postgres://... cargo test -p roster-server -- --ignored

    fn config() -> DatabaseConfig {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        DatabaseConfig::from_url(&url).expect("invalid DATABASE_URL")
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_connects_and_pings() {
        let pool = create_pool(&config()).await.expect("pool creation failed");
        ping(&pool, Duration::from_secs(5)).await.expect("ping failed");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_bounds_live_connections() {
        let mut config = config();
        config.max_connections = 2;
        let pool = create_pool(&config).await.expect("pool creation failed");

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    let result: (i32,) = sqlx::query_as("SELECT $1::int")
                        .bind(i)
                        .fetch_one(&pool)
                        .await
                        .expect("concurrent query failed");
                    result.0
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.expect("task panicked"), i as i32);
        }
        assert!(pool.size() <= 2);
    }

    #[tokio::test]
    async fn unreachable_database_fails_to_connect() {
        let mut config =
            DatabaseConfig::from_url("postgres://roster@127.0.0.1:1/roster").unwrap();
        config.acquire_timeout = Duration::from_millis(500);

        assert!(create_pool(&config).await.is_err());
    }
}
