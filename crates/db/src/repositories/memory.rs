use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use scoopy_core::domain::order::Order;
use scoopy_core::domain::session::{Message, SessionId};

use super::{MessageRepository, OrderRepository, RepositoryError, SessionRepository};

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashSet<String>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, id: &SessionId) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        if !sessions.insert(id.0.clone()) {
            return Err(RepositoryError::Decode(format!("session token `{id}` already recorded")));
        }
        Ok(())
    }

    async fn exists(&self, id: &SessionId) -> Result<bool, RepositoryError> {
        Ok(self.sessions.read().await.contains(&id.0))
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<HashMap<String, Vec<Message>>>,
}

#[async_trait::async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, message: &Message) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        messages.entry(message.session_id.0.clone()).or_default().push(message.clone());
        Ok(())
    }

    async fn list_for_session(&self, id: &SessionId) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages.get(&id.0).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderRepository {
    pub async fn all(&self) -> Vec<Order> {
        self.orders.read().await.clone()
    }
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        self.orders.write().await.push(order.clone());
        Ok(())
    }
}
