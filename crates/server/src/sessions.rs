//! Session lifecycle: token identity, transcript persistence, transient
//! memory, and the reset that closes out a completed order.
//!
//! A session has no explicit terminal state. When a turn completes an
//! order the service mints a fresh token and hands it back; the old
//! token's persisted messages stay behind as the audit log.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use scoopy_agent::runtime::TurnOutcome;
use scoopy_agent::TurnMemory;
use scoopy_core::config::ResetPolicy;
use scoopy_core::domain::session::{Message, Role, SessionId};
use scoopy_core::errors::ApplicationError;
use scoopy_db::repositories::{MessageRepository, RepositoryError, SessionRepository};

/// Confirmation phrasing the legacy heuristic looks for. Deliberately
/// unchanged from what older deployments keyed on.
const CONFIRMATION_PHRASES: &[&str] = &["cảm ơn", "cám ơn", "thank"];

pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    messages: Arc<dyn MessageRepository>,
    memory: TurnMemory,
    reset_policy: ResetPolicy,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        messages: Arc<dyn MessageRepository>,
        reset_policy: ResetPolicy,
    ) -> Self {
        Self { sessions, messages, memory: TurnMemory::new(), reset_policy }
    }

    pub fn memory(&self) -> &TurnMemory {
        &self.memory
    }

    /// Known tokens pass through unchanged. Unknown tokens are recorded
    /// as-is so the transcript foreign key holds; absent tokens get a
    /// freshly minted UUID, durably recorded before first use.
    pub async fn resolve_or_create(
        &self,
        requested: Option<SessionId>,
    ) -> Result<SessionId, ApplicationError> {
        match requested {
            Some(id) => {
                if !self.sessions.exists(&id).await.map_err(persistence_unavailable)? {
                    self.sessions.insert(&id).await.map_err(persistence_unavailable)?;
                    info!(
                        event_name = "session.recorded",
                        session_id = %id,
                        "recorded previously unknown session token"
                    );
                }
                Ok(id)
            }
            None => {
                let id = SessionId::mint();
                self.sessions.insert(&id).await.map_err(persistence_unavailable)?;
                info!(event_name = "session.created", session_id = %id, "minted new session");
                Ok(id)
            }
        }
    }

    /// Durably appends one immutable transcript row.
    pub async fn append(
        &self,
        id: &SessionId,
        role: Role,
        content: &str,
    ) -> Result<(), ApplicationError> {
        let message = Message {
            session_id: id.clone(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.messages.append(&message).await.map_err(persistence_unavailable)
    }

    /// Whether this turn closed out an order, per the configured
    /// policy. The explicit tool signal is the reliable form; the reply
    /// heuristic is a legacy fallback that false-positives on any
    /// thank-you.
    pub fn should_reset(&self, outcome: &TurnOutcome) -> bool {
        match self.reset_policy {
            ResetPolicy::ToolSignal => outcome.saved_order(),
            ResetPolicy::ReplyHeuristic => {
                let reply = outcome.reply.to_lowercase();
                CONFIRMATION_PHRASES.iter().any(|phrase| reply.contains(phrase))
            }
        }
    }

    /// Clears the old session's transient memory and mints a successor
    /// token. The old token is never reused; its rows remain.
    pub async fn reset(&self, old: &SessionId) -> Result<SessionId, ApplicationError> {
        self.memory.clear(old).await;

        let successor = SessionId::mint();
        self.sessions.insert(&successor).await.map_err(persistence_unavailable)?;
        info!(
            event_name = "session.reset",
            old_session_id = %old,
            session_id = %successor,
            "order completed; session reset"
        );
        Ok(successor)
    }
}

fn persistence_unavailable(error: RepositoryError) -> ApplicationError {
    ApplicationError::ServiceUnavailable(error.to_string())
}
