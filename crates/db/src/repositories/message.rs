use chrono::{DateTime, Utc};
use sqlx::Row;

use scoopy_core::domain::session::{Message, Role, SessionId};

use super::{MessageRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMessageRepository {
    pool: DbPool,
}

impl SqlMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepository for SqlMessageRepository {
    async fn append(&self, message: &Message) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO messages (session_uuid, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(message.session_id.as_str())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_session(&self, id: &SessionId) -> Result<Vec<Message>, RepositoryError> {
        // `id` is an AUTOINCREMENT key, so ordering by it is append order.
        let rows = sqlx::query(
            "SELECT session_uuid, role, content, created_at
             FROM messages WHERE session_uuid = ? ORDER BY id",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let role: String = row.get("role");
                let role = role
                    .parse::<Role>()
                    .map_err(|err| RepositoryError::Decode(err.to_string()))?;
                let created_at: String = row.get("created_at");
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|err| RepositoryError::Decode(err.to_string()))?
                    .with_timezone(&Utc);
                Ok(Message {
                    session_id: SessionId(row.get("session_uuid")),
                    role,
                    content: row.get("content"),
                    created_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use scoopy_core::domain::session::{Message, Role, SessionId};

    use super::SqlMessageRepository;
    use crate::repositories::{MessageRepository, SessionRepository, SqlSessionRepository};
    use crate::test_support::migrated_pool;

    fn message(session_id: &SessionId, role: Role, content: &str) -> Message {
        Message {
            session_id: session_id.clone(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn read_back_order_equals_append_order() {
        let pool = migrated_pool().await;
        let sessions = SqlSessionRepository::new(pool.clone());
        let messages = SqlMessageRepository::new(pool);

        let id = SessionId::mint();
        sessions.insert(&id).await.expect("insert session");

        let contents = ["xin chào", "menu đây ạ", "cho 1 kem ốc quế", "bạn tên gì?"];
        for (index, content) in contents.iter().enumerate() {
            let role = if index % 2 == 0 { Role::User } else { Role::Assistant };
            messages.append(&message(&id, role, content)).await.expect("append");
        }

        let stored = messages.list_for_session(&id).await.expect("list");
        let read_back: Vec<&str> = stored.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(read_back, contents);
        assert_eq!(stored[0].role, Role::User);
        assert_eq!(stored[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn messages_are_scoped_to_their_session() {
        let pool = migrated_pool().await;
        let sessions = SqlSessionRepository::new(pool.clone());
        let messages = SqlMessageRepository::new(pool);

        let first = SessionId::mint();
        let second = SessionId::mint();
        sessions.insert(&first).await.expect("insert first");
        sessions.insert(&second).await.expect("insert second");

        messages.append(&message(&first, Role::User, "đơn một")).await.expect("append");
        messages.append(&message(&second, Role::User, "đơn hai")).await.expect("append");

        let stored = messages.list_for_session(&first).await.expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content, "đơn một");
    }

    #[tokio::test]
    async fn append_without_session_violates_foreign_key() {
        let pool = migrated_pool().await;
        let messages = SqlMessageRepository::new(pool);

        let orphan = SessionId::mint();
        let result = messages.append(&message(&orphan, Role::User, "lạc đề")).await;
        assert!(result.is_err(), "messages must reference a recorded session");
    }
}
