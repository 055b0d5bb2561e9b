//! Debate persistence seam.
//!
//! The engine writes through [`DebateStore`] and never sees the backend.
//! Write ordering matters: a turn is saved (and its id returned) before
//! the corresponding log event is published, so anything a subscriber
//! hears is already durable. [`MemoryStore`] is the in-process reference
//! backend used by tests and the demo binary.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::debate::state::{DebateTurnEntry, SessionId};
use crate::debate::verdict::Verdict;
use crate::usage::TokenUsage;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A turn entry with its durable id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTurn {
    pub turn_id: String,
    pub entry: DebateTurnEntry,
}

/// The verdict row for a session. Written provisionally at session
/// start and overwritten at conclusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub verdict: Verdict,
    /// Cumulative usage at the time of the write.
    pub usage: TokenUsage,
    pub saved_at: DateTime<Utc>,
}

/// Persistence operations the engine needs.
///
/// Queries on unknown sessions return empty results rather than
/// errors; `SessionNotFound` is reserved for backends that can tell a
/// missing session from an empty one.
#[async_trait]
pub trait DebateStore: Send + Sync {
    /// Persist one turn entry, returning its durable id.
    async fn save_turn(&self, session_id: &str, entry: &DebateTurnEntry) -> StoreResult<String>;

    /// Persist (or overwrite) the session verdict with cumulative usage.
    async fn save_verdict(
        &self,
        session_id: &str,
        verdict: &Verdict,
        usage: &TokenUsage,
    ) -> StoreResult<()>;

    /// All persisted turns for a session, in write order.
    async fn get_turns(&self, session_id: &str) -> StoreResult<Vec<StoredTurn>>;

    /// The latest persisted verdict, if any.
    async fn get_verdict(&self, session_id: &str) -> StoreResult<Option<VerdictRecord>>;
}

/// Shared store handle.
pub type SharedDebateStore = Arc<dyn DebateStore>;

#[derive(Default)]
struct SessionRecord {
    turns: Vec<StoredTurn>,
    verdict: Option<VerdictRecord>,
}

/// In-memory reference store.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<SessionId, SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this store.
    pub fn shared(self) -> SharedDebateStore {
        Arc::new(self)
    }
}

#[async_trait]
impl DebateStore for MemoryStore {
    async fn save_turn(&self, session_id: &str, entry: &DebateTurnEntry) -> StoreResult<String> {
        let turn_id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .turns
            .push(StoredTurn {
                turn_id: turn_id.clone(),
                entry: entry.clone(),
            });
        Ok(turn_id)
    }

    async fn save_verdict(
        &self,
        session_id: &str,
        verdict: &Verdict,
        usage: &TokenUsage,
    ) -> StoreResult<()> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .verdict = Some(VerdictRecord {
            verdict: verdict.clone(),
            usage: *usage,
            saved_at: Utc::now(),
        });
        Ok(())
    }

    async fn get_turns(&self, session_id: &str) -> StoreResult<Vec<StoredTurn>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .get(session_id)
            .map(|record| record.turns.clone())
            .unwrap_or_default())
    }

    async fn get_verdict(&self, session_id: &str) -> StoreResult<Option<VerdictRecord>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .get(session_id)
            .and_then(|record| record.verdict.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::state::Decision;

    fn entry(turn: u32, message: &str) -> DebateTurnEntry {
        DebateTurnEntry::new("a", "Alice", turn, message)
    }

    #[tokio::test]
    async fn test_turns_keep_write_order_with_unique_ids() {
        let store = MemoryStore::new();
        let id1 = store.save_turn("s-1", &entry(1, "first")).await.unwrap();
        let id2 = store.save_turn("s-1", &entry(1, "second")).await.unwrap();
        assert_ne!(id1, id2);

        let turns = store.get_turns("s-1").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].turn_id, id1);
        assert_eq!(turns[0].entry.message, "first");
        assert_eq!(turns[1].entry.message, "second");
    }

    #[tokio::test]
    async fn test_unknown_session_queries_are_empty() {
        let store = MemoryStore::new();
        assert!(store.get_turns("ghost").await.unwrap().is_empty());
        assert!(store.get_verdict("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_final_verdict_overwrites_provisional() {
        let store = MemoryStore::new();
        store
            .save_verdict("s-1", &Verdict::provisional(), &TokenUsage::default())
            .await
            .unwrap();

        let provisional = store.get_verdict("s-1").await.unwrap().unwrap();
        assert_eq!(provisional.verdict.decision, Decision::Hold);
        assert_eq!(provisional.verdict.confidence, 0);

        let final_verdict = Verdict {
            decision: Decision::Buy,
            target_price: Some(115.0),
            confidence: 67,
            reasoning: "Alice: cheap".to_string(),
        };
        store
            .save_verdict("s-1", &final_verdict, &TokenUsage::new(45, 30, 15))
            .await
            .unwrap();

        let record = store.get_verdict("s-1").await.unwrap().unwrap();
        assert_eq!(record.verdict.decision, Decision::Buy);
        assert_eq!(record.usage, TokenUsage::new(45, 30, 15));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = MemoryStore::new();
        store.save_turn("s-1", &entry(1, "one")).await.unwrap();
        store.save_turn("s-2", &entry(1, "two")).await.unwrap();

        let turns = store.get_turns("s-1").await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].entry.message, "one");
    }
}
