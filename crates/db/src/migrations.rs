use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &["user_configuration"];

    #[tokio::test]
    async fn migrations_create_managed_schema_objects() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        run_pending(&pool).await.expect("migrations");

        for object in MANAGED_SCHEMA_OBJECTS {
            let row = sqlx::query("SELECT COUNT(*) AS count FROM sqlite_master WHERE name = ?")
                .bind(object)
                .fetch_one(&pool)
                .await
                .expect("schema lookup");
            let count: i64 = row.get("count");
            assert_eq!(count, 1, "expected schema object `{object}` after migrations");
        }

        pool.close().await;
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");

        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run");

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
            .fetch_one(&pool)
            .await
            .expect("migration ledger");
        assert_eq!(applied, MIGRATOR.iter().count() as i64);

        pool.close().await;
    }
}
