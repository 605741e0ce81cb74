use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use autoreply_core::domain::user_configuration::{UserConfiguration, UserId};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::warn;

use super::{RepositoryError, UserConfigurationRepository};
use crate::connection::DEFAULT_TIMEOUT_SECS;
use crate::DbPool;

pub struct SqlUserConfigurationRepository {
    pool: DbPool,
    operation_timeout: Duration,
}

impl SqlUserConfigurationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self::with_operation_timeout(pool, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_operation_timeout(pool: DbPool, operation_timeout: Duration) -> Self {
        Self { pool, operation_timeout }
    }

    /// Number of stored configurations. Fails when the schema has not been migrated.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        self.bounded("count", async {
            let mut conn = self.pool.acquire().await?;
            let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_configuration")
                .fetch_one(&mut *conn)
                .await?;
            Ok(rows)
        })
        .await
    }

    async fn bounded<T, F>(&self, operation: &'static str, future: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        let result = match tokio::time::timeout(self.operation_timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::Unavailable(format!(
                "user_configuration.{operation} exceeded {}ms",
                self.operation_timeout.as_millis()
            ))),
        };

        if let Err(error) = &result {
            if error.is_unavailable() {
                warn!(
                    event_name = "store.user_configuration.unavailable",
                    operation,
                    error = %error,
                    "user configuration store unavailable"
                );
            }
        }

        result
    }
}

#[async_trait]
impl UserConfigurationRepository for SqlUserConfigurationRepository {
    async fn put(&self, config: UserConfiguration) -> Result<bool, RepositoryError> {
        self.bounded("put", async {
            let mut conn = self.pool.acquire().await?;
            let result = sqlx::query(
                r#"
                INSERT INTO user_configuration (user_id, reply_message, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(user_id) DO UPDATE SET
                    reply_message = excluded.reply_message,
                    updated_at = excluded.updated_at
                WHERE user_configuration.reply_message IS NOT excluded.reply_message
                "#,
            )
            .bind(config.user_id.as_str())
            .bind(&config.reply_message)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *conn)
            .await?;

            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<UserConfiguration>, RepositoryError> {
        self.bounded("get", async {
            let mut conn = self.pool.acquire().await?;
            let row = sqlx::query(
                r#"
                SELECT user_id, reply_message
                FROM user_configuration
                WHERE user_id = ?
                "#,
            )
            .bind(user_id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

            row.map(|value| configuration_from_row(&value)).transpose()
        })
        .await
    }
}

fn configuration_from_row(row: &SqliteRow) -> Result<UserConfiguration, RepositoryError> {
    Ok(UserConfiguration {
        user_id: UserId(row.try_get("user_id")?),
        reply_message: row.try_get("reply_message")?,
    })
}
