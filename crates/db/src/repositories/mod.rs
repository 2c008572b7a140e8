use async_trait::async_trait;
use thiserror::Error;

use scoopy_core::domain::order::Order;
use scoopy_core::domain::session::{Message, SessionId};

pub mod memory;
pub mod message;
pub mod order;
pub mod session;

pub use memory::{InMemoryMessageRepository, InMemoryOrderRepository, InMemorySessionRepository};
pub use message::SqlMessageRepository;
pub use order::SqlOrderRepository;
pub use session::SqlSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Durably records a session token. The token must be recorded
    /// before any message references it (foreign key).
    async fn insert(&self, id: &SessionId) -> Result<(), RepositoryError>;

    async fn exists(&self, id: &SessionId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Appends one immutable transcript row. Rows for a session are
    /// read back in exactly the order they were appended.
    async fn append(&self, message: &Message) -> Result<(), RepositoryError>;

    async fn list_for_session(&self, id: &SessionId) -> Result<Vec<Message>, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts one confirmed order. No dedup: identical orders produce
    /// distinct rows.
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;
}
