//! Debate orchestration: the bounded multi-analyst consensus loop.
//!
//! # Session flow
//!
//! ```text
//! Debating ──round complete──► CheckConsensus
//!    ▲  │                           │
//!    │  └─ max rounds ─┐            ├─ no consensus, or confidence
//!    │                 │            │  below threshold
//!    │◄────────────────┼────────────┘
//!    │                 ▼
//!    │           FinalVerdict ◄── consensus at confidence ≥ threshold
//!    │                 │
//!    └─ next round     ▼
//!                  Concluded
//! ```

pub mod consensus;
pub mod engine;
pub mod state;
pub mod verdict;

pub use consensus::{assess_round, implied_decision, NextStep, RoundAssessment};
pub use engine::{DebateEngine, DebateError, TurnSink};
pub use state::{
    DebatePhase, DebateTurnEntry, Decision, PhaseTransition, SessionId, SessionState,
    TransitionError,
};
pub use verdict::{synthesize_verdict, Verdict};
