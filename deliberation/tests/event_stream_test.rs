//! Event bus behavior as a transport would see it: per-kind streams,
//! durable-before-published turns, terminal events, channel teardown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use deliberation::{
    AgentProfile, BusError, DebateCoordinator, DebateEvent, Decision, EventKind, FactSheet,
    FactSheetProvider, FactsError, LlmProvider, MemoryStore, ModelConfig, PromptSpec,
    ProviderError, ProviderResponse, SharedDebateStore,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

const BUY_REPLY: &str = "```json\n{\"decision\":\"BUY\",\"confidence\":90,\"summary\":\"undervalued\",\"reasoning\":\"Cheap on every multiple.\"}\n```";

struct BuyProvider;

#[async_trait]
impl LlmProvider for BuyProvider {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _model: &ModelConfig,
    ) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse::text_only(BUY_REPLY))
    }
}

/// Fails every call after the first `ok_calls`.
struct TrippingProvider {
    ok_calls: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for TrippingProvider {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _model: &ModelConfig,
    ) -> Result<ProviderResponse, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call > self.ok_calls {
            return Err(ProviderError::Status {
                status: 503,
                message: "backend overloaded".to_string(),
            });
        }
        Ok(ProviderResponse::text_only(BUY_REPLY))
    }
}

struct Facts;

#[async_trait]
impl FactSheetProvider for Facts {
    async fn get_fact_sheet(&self, symbol: &str) -> Result<FactSheet, FactsError> {
        Ok(FactSheet::new(symbol).with_current_price(50.0))
    }
}

fn catalog(n: usize) -> Vec<AgentProfile> {
    (0..n)
        .map(|i| {
            AgentProfile::new(format!("a{i}"), format!("Analyst {i}")).with_prompt(
                PromptSpec::new("You are an analyst.", "{fact_sheet}\n{debate_history}"),
            )
        })
        .collect()
}

fn coordinator_with(
    provider: Arc<dyn LlmProvider>,
    store: SharedDebateStore,
    panel: usize,
) -> DebateCoordinator {
    DebateCoordinator::new(provider, Arc::new(Facts), store, catalog(panel)).with_panel_size(panel)
}

// ── Every published turn is already durable ──────────────────────────────────

#[tokio::test]
async fn test_log_events_arrive_after_their_store_write() {
    let store = MemoryStore::new().shared();
    let coordinator = coordinator_with(Arc::new(BuyProvider), store.clone(), 2);

    let ticket = coordinator.start_session("ACME", "tests").await.unwrap();
    let mut logs = coordinator
        .subscribe(&ticket.session_id, EventKind::Log)
        .unwrap();

    let mut received = 0usize;
    while let Ok(event) = logs.recv().await {
        let DebateEvent::Log { turn_id, entry, .. } = event else {
            panic!("log channel produced a non-log event");
        };
        received += 1;

        // The turn we just heard about must already be readable.
        let stored = store.get_turns(&ticket.session_id).await.unwrap();
        let found = stored.iter().find(|t| t.turn_id == turn_id);
        let found = found.unwrap_or_else(|| panic!("turn {turn_id} not yet persisted"));
        assert_eq!(found.entry.agent_id, entry.agent_id);
        assert_eq!(found.entry.turn_number, entry.turn_number);
    }

    // Unanimous BUY concludes after the two-round floor.
    assert_eq!(received, 4);
    coordinator.join_session(&ticket.session_id).await.unwrap();
}

// ── Terminal complete event mirrors the stored verdict ───────────────────────

#[tokio::test]
async fn test_complete_event_matches_stored_verdict() {
    let store = MemoryStore::new().shared();
    let coordinator = coordinator_with(Arc::new(BuyProvider), store.clone(), 2);

    let ticket = coordinator.start_session("ACME", "tests").await.unwrap();
    let mut completes = coordinator
        .subscribe(&ticket.session_id, EventKind::Complete)
        .unwrap();

    let event = completes.recv().await.unwrap();
    let DebateEvent::Complete {
        session_id,
        decision,
        target_price,
        confidence,
        ..
    } = event
    else {
        panic!("complete channel produced a non-complete event");
    };
    assert_eq!(session_id, ticket.session_id);

    let record = store
        .get_verdict(&ticket.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(decision, record.verdict.decision);
    assert_eq!(target_price, record.verdict.target_price);
    assert_eq!(confidence, record.verdict.confidence);
    assert_eq!(decision, Decision::Buy);

    // Nothing follows a terminal event.
    assert!(completes.recv().await.is_err());
    coordinator.join_session(&ticket.session_id).await.unwrap();
}

// ── Provider failure surfaces on the error channel ───────────────────────────

#[tokio::test]
async fn test_provider_failure_publishes_error_and_keeps_partial_turns() {
    let store = MemoryStore::new().shared();
    let provider = Arc::new(TrippingProvider {
        ok_calls: 3,
        calls: AtomicUsize::new(0),
    });
    let coordinator = coordinator_with(provider, store.clone(), 2);

    let ticket = coordinator.start_session("ACME", "tests").await.unwrap();
    let mut errors = coordinator
        .subscribe(&ticket.session_id, EventKind::Error)
        .unwrap();

    let event = errors.recv().await.unwrap();
    let DebateEvent::Error { message, .. } = event else {
        panic!("error channel produced a non-error event");
    };
    assert!(message.contains("provider call failed"), "got: {message}");
    assert!(message.contains("503"), "got: {message}");

    coordinator.join_session(&ticket.session_id).await.unwrap();

    // Three turns landed before the fourth call tripped.
    let turns = store.get_turns(&ticket.session_id).await.unwrap();
    assert_eq!(turns.len(), 3);

    // The verdict row still holds the placeholder.
    let record = store
        .get_verdict(&ticket.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.verdict.decision, Decision::Hold);
    assert_eq!(record.verdict.confidence, 0);
}

// ── Channels disappear once the session is over ──────────────────────────────

#[tokio::test]
async fn test_subscribe_after_teardown_is_rejected() {
    let store = MemoryStore::new().shared();
    let coordinator = coordinator_with(Arc::new(BuyProvider), store, 2);

    let ticket = coordinator.start_session("ACME", "tests").await.unwrap();
    coordinator.join_session(&ticket.session_id).await.unwrap();

    let err = coordinator
        .subscribe(&ticket.session_id, EventKind::Log)
        .unwrap_err();
    assert!(matches!(err, BusError::UnknownSession(_)));
    assert!(!coordinator.bus().is_open(&ticket.session_id));
}

/// Yields before every reply so the test body can interleave with the
/// session task on the current-thread runtime.
struct YieldingProvider;

#[async_trait]
impl LlmProvider for YieldingProvider {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _model: &ModelConfig,
    ) -> Result<ProviderResponse, ProviderError> {
        tokio::task::yield_now().await;
        Ok(ProviderResponse::text_only(BUY_REPLY))
    }
}

#[tokio::test]
async fn test_subscriber_attached_mid_run_sees_remaining_events() {
    let store = MemoryStore::new().shared();
    let coordinator = coordinator_with(Arc::new(YieldingProvider), store, 2);

    let ticket = coordinator.start_session("ACME", "tests").await.unwrap();
    let mut logs = coordinator
        .subscribe(&ticket.session_id, EventKind::Log)
        .unwrap();

    // Consume one event, then attach a second subscriber mid-run.
    let first = logs.recv().await.unwrap();
    assert_eq!(first.kind(), EventKind::Log);

    let mut late = coordinator
        .subscribe(&ticket.session_id, EventKind::Log)
        .unwrap();
    let mut late_count = 0usize;
    while late.recv().await.is_ok() {
        late_count += 1;
    }
    // The late subscriber misses the first turn only.
    assert_eq!(late_count, 3);
    coordinator.join_session(&ticket.session_id).await.unwrap();
}
