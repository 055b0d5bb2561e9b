//! Debate engine — runs one session's round loop to completion.
//!
//! Panel turns within a round are strictly sequential: each rendered
//! prompt embeds everything said before it, so agent N+1 must wait for
//! agent N. Rounds repeat until consensus (subject to the minimum-round
//! floor and confidence threshold) or the hard round cap, then the
//! verdict is synthesized from the last full round.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DebateConfig;
use crate::debate::consensus::{assess_round, NextStep};
use crate::debate::state::{DebatePhase, DebateTurnEntry, Decision, SessionState, TransitionError};
use crate::debate::verdict::{synthesize_verdict, Verdict};
use crate::parser::parse_reply;
use crate::profile::PanelMember;
use crate::prompt::{render_instruction, PromptContext};
use crate::provider::{ProviderError, ProviderResponse, SharedLlmProvider};
use crate::usage::{extract_usage, TokenUsage};

/// Receives every recorded entry, in speaking order.
///
/// The coordinator's sink persists the entry and then publishes it; a
/// sink error is session-fatal, so implementations should only fail
/// when the session genuinely cannot continue.
#[async_trait]
pub trait TurnSink: Send + Sync {
    async fn deliver(&self, session_id: &str, entry: &DebateTurnEntry) -> anyhow::Result<()>;
}

/// Error from a debate run.
#[derive(Debug, Error)]
pub enum DebateError {
    #[error("debate requires a non-empty panel")]
    EmptyPanel,

    #[error("provider call failed for agent {agent_id}: {source}")]
    Provider {
        agent_id: String,
        source: ProviderError,
    },

    #[error("turn delivery failed: {0}")]
    Sink(anyhow::Error),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("debate cancelled")]
    Cancelled,
}

/// Drives sessions through the phase machine.
pub struct DebateEngine {
    provider: SharedLlmProvider,
    config: DebateConfig,
}

impl DebateEngine {
    pub fn new(provider: SharedLlmProvider, config: DebateConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    /// Run `session` to conclusion.
    ///
    /// Cancellation is observed at round boundaries only; the round in
    /// progress finishes first. On success the verdict is also stored
    /// on the session and the phase is `Concluded`.
    pub async fn run(
        &self,
        session: &mut SessionState,
        sink: &dyn TurnSink,
        cancel: &CancellationToken,
    ) -> Result<Verdict, DebateError> {
        if session.panel.is_empty() {
            return Err(DebateError::EmptyPanel);
        }
        info!(
            session_id = %session.id,
            symbol = %session.symbol,
            panel_size = session.panel_size(),
            "debate started"
        );

        loop {
            if cancel.is_cancelled() {
                warn!(session_id = %session.id, round = session.turn, "debate cancelled at round boundary");
                return Err(DebateError::Cancelled);
            }

            self.run_round(session, sink).await?;
            let completed = session.turn;

            if self.config.at_max_rounds(completed) {
                session.transition(
                    DebatePhase::FinalVerdict,
                    format!("max rounds ({}) reached", self.config.max_rounds),
                )?;
                break;
            }

            session.transition(DebatePhase::CheckConsensus, format!("round {completed} complete"))?;
            let assessment = assess_round(session, &self.config);
            session.consensus = assessment.consensus;
            debug!(
                session_id = %session.id,
                round = completed,
                consensus = assessment.consensus,
                average_confidence = assessment.average_confidence,
                next = %assessment.next,
                "round assessed"
            );

            match assessment.next {
                NextStep::Conclude => {
                    session.transition(DebatePhase::FinalVerdict, assessment.reason)?;
                    break;
                }
                NextStep::Continue => {
                    session.transition(DebatePhase::Debating, assessment.reason)?;
                    session.turn += 1;
                }
            }
        }

        let verdict = synthesize_verdict(session, &self.config);
        session.verdict = Some(verdict.clone());
        session.transition(DebatePhase::Concluded, verdict.summary_line())?;
        info!(
            session_id = %session.id,
            rounds = session.turn,
            verdict = %verdict.summary_line(),
            total_tokens = session.usage.total,
            "debate concluded"
        );
        Ok(verdict)
    }

    /// One full round: every panel member speaks once, in panel order.
    async fn run_round(
        &self,
        session: &mut SessionState,
        sink: &dyn TurnSink,
    ) -> Result<(), DebateError> {
        let round = session.turn;
        info!(session_id = %session.id, round, "round started");

        for seat in 0..session.panel_size() {
            let member = session.panel[seat].clone();
            let instruction = {
                let ctx = PromptContext {
                    facts: &session.facts,
                    history: &session.entries,
                    turn_number: round,
                    agent_name: &member.profile.display_name,
                };
                render_instruction(&member.prompt.instruction_template, &ctx)
            };

            let response = self
                .provider
                .complete(&member.prompt.system_prompt, &instruction, &member.profile.model)
                .await
                .map_err(|source| DebateError::Provider {
                    agent_id: member.profile.id.clone(),
                    source,
                })?;

            let usage = extract_usage(&response.payload);
            let entry = entry_from_response(&member, round, &response, usage);
            debug!(
                session_id = %session.id,
                agent_id = %member.profile.id,
                round,
                decision = ?entry.decision,
                confidence = ?entry.confidence,
                tokens = usage.total,
                "turn recorded"
            );

            session.record_turn(entry.clone());
            sink.deliver(&session.id, &entry)
                .await
                .map_err(DebateError::Sink)?;
        }
        Ok(())
    }
}

/// Build the logged entry for one reply, degrading an unusable reply
/// to a HOLD at confidence 50.
fn entry_from_response(
    member: &PanelMember,
    round: u32,
    response: &ProviderResponse,
    usage: TokenUsage,
) -> DebateTurnEntry {
    let (message, summary, decision, confidence) = match parse_reply(&response.text) {
        Some(reply) => (reply.reasoning, reply.summary, reply.decision, reply.confidence),
        None => (response.text.clone(), String::new(), Decision::Hold, 50),
    };
    let metadata = serde_json::json!({
        "model": member.profile.model.model,
        "temperature": member.profile.model.temperature,
        "raw_text": response.text,
    });
    DebateTurnEntry::new(
        member.profile.id.as_str(),
        member.profile.display_name.as_str(),
        round,
        message,
    )
    .with_summary(summary)
    .with_decision(decision, confidence)
    .with_usage(usage)
    .with_metadata(metadata)
}
