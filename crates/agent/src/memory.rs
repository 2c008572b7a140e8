use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use scoopy_core::domain::session::{SessionId, Turn};

struct MemoryEntry {
    turns: Arc<Mutex<Vec<Turn>>>,
    last_used: Instant,
}

/// Transient conversation memory, keyed by session token.
///
/// Each session owns its own ordered turn history behind its own lock:
/// holding a session's guard for the duration of a turn gives
/// single-writer-per-session without ever blocking other sessions. A
/// process-wide shared buffer would interleave concurrent
/// conversations, so none exists here.
///
/// Completed orders clear their entry via [`TurnMemory::clear`];
/// abandoned conversations never do, so the owner is expected to call
/// [`TurnMemory::evict_idle`] periodically. Eviction only drops context:
/// the token stays valid and a later request simply starts from an
/// empty history.
#[derive(Clone, Default)]
pub struct TurnMemory {
    entries: Arc<RwLock<HashMap<String, MemoryEntry>>>,
}

impl TurnMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the session's history for the duration of one turn,
    /// creating an empty entry for unseen tokens.
    pub async fn lock(&self, id: &SessionId) -> OwnedMutexGuard<Vec<Turn>> {
        let turns = {
            let mut entries = self.entries.write().await;
            let entry = entries.entry(id.0.clone()).or_insert_with(|| MemoryEntry {
                turns: Arc::default(),
                last_used: Instant::now(),
            });
            entry.last_used = Instant::now();
            entry.turns.clone()
        };
        turns.lock_owned().await
    }

    /// Drops the session's transient history. Persisted messages are
    /// untouched; they remain as the audit log of the old session.
    pub async fn clear(&self, id: &SessionId) {
        self.entries.write().await.remove(&id.0);
    }

    /// Drops every history that has not been locked within `max_idle`.
    /// Sessions whose guard is currently held are mid-turn and are
    /// always kept. Returns how many entries were evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.last_used.elapsed() <= max_idle || Arc::strong_count(&entry.turns) > 1
        });
        before - entries.len()
    }

    /// Read-only copy of a session's history (empty for unseen tokens).
    pub async fn snapshot(&self, id: &SessionId) -> Vec<Turn> {
        let turns = {
            let entries = self.entries.read().await;
            entries.get(&id.0).map(|entry| entry.turns.clone())
        };
        match turns {
            Some(turns) => turns.lock().await.clone(),
            None => Vec::new(),
        }
    }
}
