use scoopy_core::domain::session::SessionId;

use super::{RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn insert(&self, id: &SessionId) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO sessions (session_uuid) VALUES (?)")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn exists(&self, id: &SessionId) -> Result<bool, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE session_uuid = ?")
                .bind(id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use scoopy_core::domain::session::SessionId;

    use super::SqlSessionRepository;
    use crate::repositories::SessionRepository;
    use crate::test_support::migrated_pool;

    #[tokio::test]
    async fn insert_then_exists_round_trip() {
        let repo = SqlSessionRepository::new(migrated_pool().await);

        let id = SessionId::mint();
        assert!(!repo.exists(&id).await.expect("exists check"));

        repo.insert(&id).await.expect("insert session");
        assert!(repo.exists(&id).await.expect("exists check"));
    }

    #[tokio::test]
    async fn duplicate_token_insert_is_rejected() {
        let repo = SqlSessionRepository::new(migrated_pool().await);

        let id = SessionId::mint();
        repo.insert(&id).await.expect("insert session");
        assert!(repo.insert(&id).await.is_err(), "primary key should reject reuse");
    }
}
