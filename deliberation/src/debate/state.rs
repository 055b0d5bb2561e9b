//! Debate session state and the phase state machine.
//!
//! A session moves `Debating -> CheckConsensus -> {Debating | FinalVerdict}
//! -> Concluded`, with a direct `Debating -> FinalVerdict` edge for the
//! max-rounds bypass. Transitions are validated against an explicit table
//! and recorded with timestamps so a finished session explains itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::debate::verdict::Verdict;
use crate::facts::FactSheet;
use crate::profile::PanelMember;
use crate::usage::TokenUsage;

/// Unique identifier for debate sessions.
pub type SessionId = String;

/// An analyst's stance on the symbol under debate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Buy,
    Sell,
    Hold,
}

impl Decision {
    /// All decisions, in tie-break priority order.
    pub const ALL: [Decision; 3] = [Decision::Buy, Decision::Sell, Decision::Hold];

    /// Parse a bare decision token, case-insensitively.
    pub fn from_token(token: &str) -> Option<Decision> {
        match token.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(Decision::Buy),
            "sell" => Some(Decision::Sell),
            "hold" => Some(Decision::Hold),
            _ => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Buy => write!(f, "BUY"),
            Decision::Sell => write!(f, "SELL"),
            Decision::Hold => write!(f, "HOLD"),
        }
    }
}

/// Phase of a debate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    /// Panel agents are speaking in rounds.
    Debating,
    /// Evaluating the latest round for convergence.
    CheckConsensus,
    /// Synthesizing the final verdict.
    FinalVerdict,
    /// Terminal. Verdict is set, no further work.
    Concluded,
}

impl DebatePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DebatePhase::Concluded)
    }

    /// Phases reachable from this one.
    pub fn valid_transitions(&self) -> &'static [DebatePhase] {
        match self {
            // Direct FinalVerdict edge is the max-rounds bypass.
            DebatePhase::Debating => &[DebatePhase::CheckConsensus, DebatePhase::FinalVerdict],
            DebatePhase::CheckConsensus => &[DebatePhase::Debating, DebatePhase::FinalVerdict],
            DebatePhase::FinalVerdict => &[DebatePhase::Concluded],
            DebatePhase::Concluded => &[],
        }
    }

    pub fn can_transition(&self, to: DebatePhase) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebatePhase::Debating => write!(f, "debating"),
            DebatePhase::CheckConsensus => write!(f, "check_consensus"),
            DebatePhase::FinalVerdict => write!(f, "final_verdict"),
            DebatePhase::Concluded => write!(f, "concluded"),
        }
    }
}

/// A recorded phase change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Attempted phase change not present in the transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: DebatePhase,
    pub to: DebatePhase,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid phase transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

/// One agent's contribution in one round. Append-only once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateTurnEntry {
    pub agent_id: String,
    pub agent_name: String,

    /// Round number the entry belongs to, 1-based.
    pub turn_number: u32,

    /// Full reasoning text.
    pub message: String,

    /// Short summary for history rendering. May be empty.
    pub summary: String,

    /// Structured stance, when the reply carried one.
    pub decision: Option<Decision>,

    /// 0-100, when the reply carried one.
    pub confidence: Option<u8>,

    /// Token usage for this single call.
    pub usage: TokenUsage,

    /// Free-form call details (model, temperature, raw text).
    pub metadata: Value,
}

impl DebateTurnEntry {
    pub fn new(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        turn_number: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            turn_number,
            message: message.into(),
            summary: String::new(),
            decision: None,
            confidence: None,
            usage: TokenUsage::default(),
            metadata: Value::Null,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_decision(mut self, decision: Decision, confidence: u8) -> Self {
        self.decision = Some(decision);
        self.confidence = Some(confidence);
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Mutable state of one debate run.
///
/// Owned and mutated exclusively by the engine task for its session; the
/// coordinator only sees it before launch and through the final verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub id: SessionId,
    pub symbol: String,
    pub facts: FactSheet,

    /// Fixed ordered panel for the whole session.
    pub panel: Vec<PanelMember>,

    /// Append-only debate log.
    pub entries: Vec<DebateTurnEntry>,

    /// Number of the round currently being executed, 1-based.
    pub turn: u32,

    /// Result of the most recent consensus check.
    pub consensus: bool,

    /// Running sum of per-turn usage.
    pub usage: TokenUsage,

    /// Set exactly once, at FinalVerdict.
    pub verdict: Option<Verdict>,

    pub phase: DebatePhase,
    pub transitions: Vec<PhaseTransition>,
    pub created_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        facts: FactSheet,
        panel: Vec<PanelMember>,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            facts,
            panel,
            entries: Vec::new(),
            turn: 1,
            consensus: false,
            usage: TokenUsage::default(),
            verdict: None,
            phase: DebatePhase::Debating,
            transitions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn panel_size(&self) -> usize {
        self.panel.len()
    }

    /// Append an entry and fold its usage into the running sum.
    pub fn record_turn(&mut self, entry: DebateTurnEntry) {
        self.usage += entry.usage;
        self.entries.push(entry);
    }

    /// Move to `to`, recording the transition, or fail if the edge is not
    /// in the table.
    pub fn transition(
        &mut self,
        to: DebatePhase,
        reason: impl Into<String>,
    ) -> Result<(), TransitionError> {
        if !self.phase.can_transition(to) {
            return Err(TransitionError {
                from: self.phase,
                to,
            });
        }
        self.transitions.push(PhaseTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.into(),
        });
        self.phase = to;
        Ok(())
    }

    /// One-line status for logs.
    pub fn status_line(&self) -> String {
        format!(
            "session {} [{}] round {} entries {} consensus {}",
            self.id,
            self.phase,
            self.turn,
            self.entries.len(),
            self.consensus
        )
    }
}
