//! Session event payloads.
//!
//! Events are only published after the data they describe is durable:
//! a `Log` event carries the store-assigned turn id, and `Complete`
//! carries the verdict as persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::debate::state::{DebateTurnEntry, Decision, SessionId};
use crate::debate::verdict::Verdict;

/// The three per-session event streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Log,
    Complete,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Log, EventKind::Complete, EventKind::Error];
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Log => write!(f, "log"),
            EventKind::Complete => write!(f, "complete"),
            EventKind::Error => write!(f, "error"),
        }
    }
}

/// Session-scoped events delivered over the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    /// One persisted turn entry.
    Log {
        session_id: SessionId,
        /// Durable id assigned by the store before publication.
        turn_id: String,
        entry: DebateTurnEntry,
        timestamp: DateTime<Utc>,
    },

    /// Terminal: the session concluded with a verdict.
    Complete {
        session_id: SessionId,
        decision: Decision,
        target_price: Option<f64>,
        confidence: u8,
        reasoning: String,
        timestamp: DateTime<Utc>,
    },

    /// Terminal: the session failed or was cancelled.
    Error {
        session_id: SessionId,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl DebateEvent {
    pub fn log(session_id: impl Into<SessionId>, turn_id: impl Into<String>, entry: DebateTurnEntry) -> Self {
        DebateEvent::Log {
            session_id: session_id.into(),
            turn_id: turn_id.into(),
            entry,
            timestamp: Utc::now(),
        }
    }

    pub fn complete(session_id: impl Into<SessionId>, verdict: &Verdict) -> Self {
        DebateEvent::Complete {
            session_id: session_id.into(),
            decision: verdict.decision,
            target_price: verdict.target_price,
            confidence: verdict.confidence,
            reasoning: verdict.reasoning.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(session_id: impl Into<SessionId>, message: impl Into<String>) -> Self {
        DebateEvent::Error {
            session_id: session_id.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Which stream this event belongs on.
    pub fn kind(&self) -> EventKind {
        match self {
            DebateEvent::Log { .. } => EventKind::Log,
            DebateEvent::Complete { .. } => EventKind::Complete,
            DebateEvent::Error { .. } => EventKind::Error,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            DebateEvent::Log { session_id, .. } => session_id,
            DebateEvent::Complete { session_id, .. } => session_id,
            DebateEvent::Error { session_id, .. } => session_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DebateEvent::Log { timestamp, .. } => *timestamp,
            DebateEvent::Complete { timestamp, .. } => *timestamp,
            DebateEvent::Error { timestamp, .. } => *timestamp,
        }
    }

    /// Whether this event ends its session's streams.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DebateEvent::Log { .. })
    }
}
