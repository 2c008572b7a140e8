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
    use crate::migrations::MIGRATOR;
    use crate::test_support::memory_pool;

    const MANAGED_SCHEMA_OBJECTS: &[&str] =
        &["sessions", "messages", "orders", "idx_messages_session_uuid"];

    #[tokio::test]
    async fn migrations_create_baseline_tables() {
        let pool = memory_pool().await;
        run_pending(&pool).await.expect("run migrations");

        for table in ["sessions", "messages", "orders"] {
            let count = sqlx::query(
                "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .expect("check table")
            .get::<i64, _>("count");
            assert_eq!(count, 1, "table `{table}` should exist after migrations");
        }
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = memory_pool().await;
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        let remaining: Vec<String> = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type IN ('table', 'index')",
        )
        .fetch_all(&pool)
        .await
        .expect("load schema objects")
        .into_iter()
        .map(|row| row.get::<String, _>("name"))
        .filter(|name| MANAGED_SCHEMA_OBJECTS.contains(&name.as_str()))
        .collect();

        assert!(remaining.is_empty(), "managed schema objects should be removed: {remaining:?}");
    }

    #[tokio::test]
    async fn migrations_up_down_up_preserves_schema_signature() {
        let pool = memory_pool().await;
        run_pending(&pool).await.expect("run migrations");

        let initial_signature = managed_schema_signature(&pool).await;
        assert_eq!(
            initial_signature.len(),
            MANAGED_SCHEMA_OBJECTS.len(),
            "initial migration pass should create all managed schema objects",
        );

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");
        run_pending(&pool).await.expect("re-run migrations");

        let after_second_up_signature = managed_schema_signature(&pool).await;
        assert_eq!(
            after_second_up_signature, initial_signature,
            "up/down/up should preserve migration-managed schema signature",
        );
    }

    async fn managed_schema_signature(pool: &sqlx::SqlitePool) -> Vec<(String, String, String)> {
        let mut signature: Vec<(String, String, String)> = sqlx::query(
            "SELECT type, name, IFNULL(sql, '') AS sql
             FROM sqlite_master
             WHERE type IN ('table', 'index')",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects")
        .into_iter()
        .filter_map(|row| {
            let name = row.get::<String, _>("name");
            if MANAGED_SCHEMA_OBJECTS.contains(&name.as_str()) {
                Some((row.get::<String, _>("type"), name, row.get::<String, _>("sql")))
            } else {
                None
            }
        })
        .collect();
        signature.sort();
        signature
    }
}
