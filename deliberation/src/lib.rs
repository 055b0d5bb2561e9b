//! Multi-Agent Stock Debate Library
//!
//! This library drives a panel of LLM-backed financial analysts through
//! a bounded, turn-based debate over a stock fact sheet and distills the
//! exchange into a single BUY / SELL / HOLD verdict.
//!
//! # Pieces
//!
//! ## Session lifecycle
//! - `DebateCoordinator`: validates a request, launches the session on a
//!   supervised task, and exposes join / cancel / shutdown
//! - `DebateEngine`: the round loop, one turn per panel seat, with a
//!   consensus check between rounds
//! - `SessionState`: the full record of one debate, phases included
//!
//! ## Panel and prompts
//! - `AgentProfile` / `PanelMember`: analyst identities and their prompts
//! - `AgentSelector`: model-assisted panel selection with a deterministic
//!   fact-coverage fallback
//! - `prompt`: instruction rendering (fact sheet, debate history)
//!
//! ## Data in / data out
//! - `FactSheetProvider`: pluggable source of per-symbol fact sheets
//! - `LlmProvider`: pluggable chat-completion backend
//! - `parse_reply`: lenient extraction of decision / confidence / summary
//!   from free-form model text
//! - `synthesize_verdict`: vote tally and target-price synthesis
//!
//! ## Plumbing
//! - `EventBus`: per-session broadcast channels (log / complete / error)
//! - `DebateStore`: persistence seam, with an in-memory default
//!
//! # Usage
//!
//! ```ignore
//! let coordinator = DebateCoordinator::new(provider, facts, store, catalog);
//! let ticket = coordinator.start_session("AAPL", "cli").await?;
//! let mut logs = coordinator.subscribe(&ticket.session_id, EventKind::Log)?;
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod coordinator;
pub mod debate;
pub mod events;
pub mod facts;
pub mod parser;
pub mod profile;
pub mod prompt;
pub mod provider;
pub mod selector;
pub mod store;
pub mod usage;

// Re-export key session types
pub use coordinator::{CoordinatorError, DebateCoordinator, SessionTicket};
pub use debate::{
    assess_round, synthesize_verdict, DebateEngine, DebateError, DebatePhase, DebateTurnEntry,
    Decision, NextStep, PhaseTransition, RoundAssessment, SessionId, SessionState,
    TransitionError, TurnSink, Verdict,
};

// Re-export panel types
pub use profile::{AgentProfile, ModelConfig, PanelMember, PromptSpec};
pub use selector::{AgentSelector, SelectorError};

// Re-export data seams
pub use facts::{FactCategory, FactSheet, FactSheetProvider, FactsError, SharedFactSheetProvider};
pub use parser::{parse_reply, ParsedReply};
pub use provider::{LlmProvider, ProviderError, ProviderResponse, SharedLlmProvider};
pub use store::{
    DebateStore, MemoryStore, SharedDebateStore, StoreError, StoreResult, StoredTurn,
    VerdictRecord,
};

// Re-export plumbing
pub use config::DebateConfig;
pub use events::{BusError, DebateEvent, EventBus, EventKind, SharedEventBus};
pub use usage::{extract_usage, TokenUsage};
