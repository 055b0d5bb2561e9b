//! End-to-end session runs with scripted providers — no live LLM.
//!
//! Covers: coordinator ↔ engine ↔ consensus ↔ verdict ↔ store running
//! together, and the round-count / turn-number / usage bookkeeping a
//! transport would observe through the store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use deliberation::{
    AgentProfile, DebateCoordinator, Decision, FactSheet, FactSheetProvider, FactsError,
    LlmProvider, MemoryStore, ModelConfig, PromptSpec, ProviderError, ProviderResponse,
    SharedDebateStore,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

const BUY_REPLY: &str = "```json\n{\"decision\":\"BUY\",\"confidence\":90,\"summary\":\"undervalued on earnings\",\"reasoning\":\"Multiples are below peers.\"}\n```";
const SELL_REPLY: &str = "```json\n{\"decision\":\"SELL\",\"confidence\":85,\"summary\":\"momentum rolling over\",\"reasoning\":\"Price is below both moving averages.\"}\n```";
const HOLD_REPLY: &str = "```json\n{\"decision\":\"HOLD\",\"confidence\":40,\"summary\":\"mixed picture\",\"reasoning\":\"Valuation and momentum disagree.\"}\n```";

/// Replays a fixed prefix, then walks a repeating cycle.
struct ScriptedProvider {
    state: Mutex<ScriptState>,
    cycle: Vec<String>,
}

struct ScriptState {
    queue: VecDeque<String>,
    cycled: usize,
}

impl ScriptedProvider {
    fn cycling(replies: &[&str]) -> Arc<Self> {
        Self::build(&[], replies)
    }

    fn sequence(replies: &[&str]) -> Arc<Self> {
        Self::build(replies, &[replies.last().copied().unwrap_or(HOLD_REPLY)])
    }

    fn build(prefix: &[&str], cycle: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ScriptState {
                queue: prefix.iter().map(|r| r.to_string()).collect(),
                cycled: 0,
            }),
            cycle: cycle.iter().map(|r| r.to_string()).collect(),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _model: &ModelConfig,
    ) -> Result<ProviderResponse, ProviderError> {
        let mut state = self.state.lock().unwrap();
        if let Some(reply) = state.queue.pop_front() {
            return Ok(ProviderResponse::text_only(reply));
        }
        let index = state.cycled % self.cycle.len();
        state.cycled += 1;
        Ok(ProviderResponse::text_only(self.cycle[index].clone()))
    }
}

struct Facts;

#[async_trait]
impl FactSheetProvider for Facts {
    async fn get_fact_sheet(&self, symbol: &str) -> Result<FactSheet, FactsError> {
        Ok(FactSheet::new(symbol).with_current_price(100.0))
    }
}

fn analyst(id: &str) -> AgentProfile {
    AgentProfile::new(id, format!("Analyst {id}")).with_prompt(PromptSpec::new(
        "You are a financial analyst in a panel debate.",
        "Turn {turn_number} on {symbol}.\n{fact_sheet}\n{debate_history}",
    ))
}

fn coordinator_with(
    provider: Arc<dyn LlmProvider>,
    store: SharedDebateStore,
    panel: usize,
) -> DebateCoordinator {
    let catalog = (0..panel).map(|i| analyst(&format!("a{i}"))).collect();
    DebateCoordinator::new(provider, Arc::new(Facts), store, catalog).with_panel_size(panel)
}

// ── Consensus at the minimum-round floor ─────────────────────────────────────

#[tokio::test]
async fn test_unanimous_panel_stops_at_two_rounds() {
    let store = MemoryStore::new().shared();
    let coordinator = coordinator_with(ScriptedProvider::cycling(&[BUY_REPLY]), store.clone(), 3);

    let ticket = coordinator.start_session("ACME", "tests").await.unwrap();
    coordinator.join_session(&ticket.session_id).await.unwrap();

    // Unanimous from round one, but the floor forces a second round.
    let turns = store.get_turns(&ticket.session_id).await.unwrap();
    assert_eq!(turns.len(), 6, "two rounds of three agents");

    let record = store
        .get_verdict(&ticket.session_id)
        .await
        .unwrap()
        .expect("verdict row exists");
    assert_eq!(record.verdict.decision, Decision::Buy);
    assert_eq!(record.verdict.confidence, 100);
}

// ── Deadlock runs to the round cap ───────────────────────────────────────────

#[tokio::test]
async fn test_split_panel_runs_to_round_cap() {
    let store = MemoryStore::new().shared();
    let provider = ScriptedProvider::cycling(&[BUY_REPLY, SELL_REPLY, HOLD_REPLY]);
    let coordinator = coordinator_with(provider, store.clone(), 3);

    let ticket = coordinator.start_session("ACME", "tests").await.unwrap();
    coordinator.join_session(&ticket.session_id).await.unwrap();

    let turns = store.get_turns(&ticket.session_id).await.unwrap();
    assert_eq!(turns.len(), 15, "five rounds of three agents");

    // Final round splits 1/1/1; the tie resolves in BUY, SELL, HOLD order.
    let record = store
        .get_verdict(&ticket.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.verdict.decision, Decision::Buy);
    assert_eq!(record.verdict.confidence, 33);
}

// ── Unanimity below the confidence bar keeps debating ────────────────────────

#[tokio::test]
async fn test_low_confidence_agreement_does_not_conclude_early() {
    let store = MemoryStore::new().shared();
    let coordinator = coordinator_with(ScriptedProvider::cycling(&[HOLD_REPLY]), store.clone(), 2);

    let ticket = coordinator.start_session("ACME", "tests").await.unwrap();
    coordinator.join_session(&ticket.session_id).await.unwrap();

    // Everyone says HOLD at 40% confidence; 40 < threshold, so the
    // debate only ends when the cap does it.
    let turns = store.get_turns(&ticket.session_id).await.unwrap();
    assert_eq!(turns.len(), 10, "five rounds of two agents");

    let record = store
        .get_verdict(&ticket.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.verdict.decision, Decision::Hold);
    // Tally confidence, not debate confidence: 2 of 2 votes.
    assert_eq!(record.verdict.confidence, 100);
    // HOLD keeps the target at the current price.
    assert_eq!(record.verdict.target_price, Some(100.0));
}

// ── Turn numbering groups the panel per round ────────────────────────────────

#[tokio::test]
async fn test_turn_numbers_group_by_round() {
    let store = MemoryStore::new().shared();
    let coordinator = coordinator_with(ScriptedProvider::cycling(&[BUY_REPLY]), store.clone(), 3);

    let ticket = coordinator.start_session("ACME", "tests").await.unwrap();
    coordinator.join_session(&ticket.session_id).await.unwrap();

    let turns = store.get_turns(&ticket.session_id).await.unwrap();
    let numbers: Vec<u32> = turns.iter().map(|t| t.entry.turn_number).collect();
    assert_eq!(numbers, vec![1, 1, 1, 2, 2, 2]);

    // Speaking order within a round follows the panel order.
    let round_one: Vec<&str> = turns[..3].iter().map(|t| t.entry.agent_id.as_str()).collect();
    assert_eq!(round_one, vec!["a0", "a1", "a2"]);
}

// ── Explicit price targets win over the heuristic ────────────────────────────

#[tokio::test]
async fn test_explicit_target_is_extracted_from_final_round() {
    let with_target = "```json\n{\"decision\":\"BUY\",\"confidence\":95,\"summary\":\"room to run\",\"reasoning\":\"My price target is $150 on normalized earnings.\"}\n```";
    let store = MemoryStore::new().shared();
    // Round 1: plain BUYs. Round 2: one reply carries a dollar target.
    let provider = ScriptedProvider::sequence(&[BUY_REPLY, BUY_REPLY, BUY_REPLY, with_target]);
    let coordinator = coordinator_with(provider, store.clone(), 2);

    let ticket = coordinator.start_session("ACME", "tests").await.unwrap();
    coordinator.join_session(&ticket.session_id).await.unwrap();

    let record = store
        .get_verdict(&ticket.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.verdict.decision, Decision::Buy);
    assert_eq!(record.verdict.target_price, Some(150.0));
}

#[tokio::test]
async fn test_heuristic_target_when_no_one_names_a_price() {
    let store = MemoryStore::new().shared();
    let coordinator = coordinator_with(ScriptedProvider::cycling(&[BUY_REPLY]), store.clone(), 2);

    let ticket = coordinator.start_session("ACME", "tests").await.unwrap();
    coordinator.join_session(&ticket.session_id).await.unwrap();

    let record = store
        .get_verdict(&ticket.session_id)
        .await
        .unwrap()
        .unwrap();
    // BUY heuristic: 15% above the current price.
    assert_eq!(record.verdict.target_price, Some(115.0));
}

// ── Token usage accumulates across every turn ───────────────────────────────

struct MeteredProvider;

#[async_trait]
impl LlmProvider for MeteredProvider {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _model: &ModelConfig,
    ) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse::new(
            BUY_REPLY,
            json!({
                "usage_metadata": { "input_tokens": 10, "output_tokens": 5, "total_tokens": 15 }
            }),
        ))
    }
}

#[tokio::test]
async fn test_usage_sums_over_all_turns() {
    let store = MemoryStore::new().shared();
    let coordinator = coordinator_with(Arc::new(MeteredProvider), store.clone(), 2);

    let ticket = coordinator.start_session("ACME", "tests").await.unwrap();
    coordinator.join_session(&ticket.session_id).await.unwrap();

    // Two rounds of two agents, 15 total tokens per turn.
    let record = store
        .get_verdict(&ticket.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.usage.total, 60);
    assert_eq!(record.usage.prompt, 40);
    assert_eq!(record.usage.completion, 20);
}
