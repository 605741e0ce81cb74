use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Builds the shared pool. Connections are checked out per query and returned on drop, so
/// `timeout_secs` bounds how long a single store call may wait for one.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

#[cfg(test)]
mod tests {
    use super::connect_with_settings;

    #[tokio::test]
    async fn in_memory_pool_answers_queries() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");

        let value: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.expect("select");

        assert_eq!(value, 1);
        pool.close().await;
    }

    #[tokio::test]
    async fn zero_settings_are_clamped_to_usable_minimums() {
        let pool = connect_with_settings("sqlite::memory:", 0, 0).await.expect("connect");

        assert!(pool.options().get_max_connections() >= 1);
        pool.close().await;
    }
}
