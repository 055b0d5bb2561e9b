//! Session coordinator.
//!
//! The engine's front door. `start_session` validates everything that
//! can fail fast (fact sheet, panel), persists the provisional verdict,
//! opens the event channels, and only then launches the debate on a
//! supervised task. From that point on the caller interacts through the
//! event bus and the store; the handle registry exists so runs can be
//! awaited, cancelled one at a time, or shut down together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::DebateConfig;
use crate::debate::engine::{DebateEngine, TurnSink};
use crate::debate::state::{DebateTurnEntry, SessionId, SessionState};
use crate::debate::verdict::Verdict;
use crate::events::bus::{BusError, EventBus, SharedEventBus};
use crate::events::types::{DebateEvent, EventKind};
use crate::facts::{FactsError, SharedFactSheetProvider};
use crate::profile::{AgentProfile, ModelConfig, PanelMember};
use crate::provider::SharedLlmProvider;
use crate::selector::AgentSelector;
use crate::store::{SharedDebateStore, StoreError};
use crate::usage::TokenUsage;

/// Panel size requested from the selector unless overridden.
const DEFAULT_PANEL_SIZE: usize = 4;

/// Error from coordinator operations.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Facts(#[from] FactsError),

    #[error("no eligible analysts for symbol {0}")]
    EmptyPanel(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("session task panicked: {0}")]
    Join(String),
}

/// Receipt for a launched session.
#[derive(Debug, Clone)]
pub struct SessionTicket {
    pub session_id: SessionId,
    pub symbol: String,
    /// The seated panel, in speaking order.
    pub panel: Vec<PanelMember>,
}

struct SessionHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Launches and supervises debate sessions.
pub struct DebateCoordinator {
    engine: Arc<DebateEngine>,
    selector: AgentSelector,
    facts: SharedFactSheetProvider,
    store: SharedDebateStore,
    bus: SharedEventBus,
    config: DebateConfig,
    catalog: Vec<AgentProfile>,
    panel_size: usize,
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
    tracker: TaskTracker,
}

impl DebateCoordinator {
    pub fn new(
        provider: SharedLlmProvider,
        facts: SharedFactSheetProvider,
        store: SharedDebateStore,
        catalog: Vec<AgentProfile>,
    ) -> Self {
        Self::with_config(provider, facts, store, catalog, DebateConfig::default())
    }

    pub fn with_config(
        provider: SharedLlmProvider,
        facts: SharedFactSheetProvider,
        store: SharedDebateStore,
        catalog: Vec<AgentProfile>,
        config: DebateConfig,
    ) -> Self {
        Self {
            selector: AgentSelector::new(provider.clone()),
            engine: Arc::new(DebateEngine::new(provider, config.clone())),
            facts,
            store,
            bus: EventBus::new().shared(),
            config,
            catalog,
            panel_size: DEFAULT_PANEL_SIZE,
            sessions: Mutex::new(HashMap::new()),
            tracker: TaskTracker::new(),
        }
    }

    pub fn with_panel_size(mut self, panel_size: usize) -> Self {
        self.panel_size = panel_size;
        self
    }

    /// Model settings for the panel-selection call.
    pub fn with_selector_model(mut self, model: ModelConfig) -> Self {
        self.selector = self.selector.with_model(model);
        self
    }

    /// The bus transports subscribe through.
    pub fn bus(&self) -> SharedEventBus {
        self.bus.clone()
    }

    /// The store history endpoints read from.
    pub fn store(&self) -> SharedDebateStore {
        self.store.clone()
    }

    /// Subscribe to one of a session's event streams.
    pub fn subscribe(
        &self,
        session_id: &str,
        kind: EventKind,
    ) -> Result<broadcast::Receiver<DebateEvent>, BusError> {
        self.bus.subscribe(session_id, kind)
    }

    /// Validate, persist the placeholder, open channels, and launch.
    ///
    /// Returns as soon as the run is spawned. Fact-sheet failures and
    /// an empty panel surface here, before any background work exists.
    pub async fn start_session(
        &self,
        symbol: &str,
        requester: &str,
    ) -> Result<SessionTicket, CoordinatorError> {
        let facts = self.facts.get_fact_sheet(symbol).await?;
        let panel = self
            .selector
            .select_panel(&facts, &self.catalog, self.panel_size)
            .await;
        if panel.is_empty() {
            return Err(CoordinatorError::EmptyPanel(symbol.to_string()));
        }

        let session_id: SessionId = Uuid::new_v4().to_string();
        // Provisional row first: history reads never miss a live session.
        self.store
            .save_verdict(&session_id, &Verdict::provisional(), &TokenUsage::default())
            .await?;
        self.bus.open(&session_id);

        info!(
            session_id = %session_id,
            symbol,
            requester,
            panel_size = panel.len(),
            "session launching"
        );

        let ticket = SessionTicket {
            session_id: session_id.clone(),
            symbol: symbol.to_string(),
            panel: panel.clone(),
        };

        let session = SessionState::new(session_id.as_str(), symbol, facts, panel);
        let cancel = CancellationToken::new();
        self.spawn_watchdog(&session_id, &cancel);
        let join = self.tracker.spawn(self.session_task(session, cancel.clone()));
        self.registry()
            .insert(session_id, SessionHandle { cancel, join });

        Ok(ticket)
    }

    /// Wait for a session's task to finish. Removes the handle.
    pub async fn join_session(&self, session_id: &str) -> Result<(), CoordinatorError> {
        let handle = self
            .registry()
            .remove(session_id)
            .ok_or_else(|| CoordinatorError::UnknownSession(session_id.to_string()))?;
        handle
            .join
            .await
            .map_err(|err| CoordinatorError::Join(err.to_string()))
    }

    /// Request cancellation. The in-flight round finishes; no further
    /// round starts; the session still publishes a terminal event.
    pub fn cancel_session(&self, session_id: &str) -> Result<(), CoordinatorError> {
        let registry = self.registry();
        let handle = registry
            .get(session_id)
            .ok_or_else(|| CoordinatorError::UnknownSession(session_id.to_string()))?;
        handle.cancel.cancel();
        info!(session_id, "session cancellation requested");
        Ok(())
    }

    /// Whether a session's task is still running.
    pub fn is_active(&self, session_id: &str) -> bool {
        self.registry()
            .get(session_id)
            .map(|handle| !handle.join.is_finished())
            .unwrap_or(false)
    }

    /// Cancel everything and wait for all session tasks to stop.
    pub async fn shutdown(&self) {
        let handles: Vec<SessionHandle> = {
            let mut registry = self.registry();
            registry.drain().map(|(_, handle)| handle).collect()
        };
        for handle in &handles {
            handle.cancel.cancel();
        }
        self.tracker.close();
        self.tracker.wait().await;
        info!(sessions = handles.len(), "coordinator shut down");
    }

    /// The supervised body of one session.
    fn session_task(
        &self,
        mut session: SessionState,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = ()> + Send + 'static {
        let engine = self.engine.clone();
        let store = self.store.clone();
        let bus = self.bus.clone();
        async move {
            let session_id = session.id.clone();
            let sink = PersistingSink {
                store: store.clone(),
                bus: bus.clone(),
            };

            match engine.run(&mut session, &sink, &cancel).await {
                Ok(verdict) => {
                    match store
                        .save_verdict(&session_id, &verdict, &session.usage)
                        .await
                    {
                        Ok(()) => {
                            bus.publish(DebateEvent::complete(session_id.as_str(), &verdict));
                            info!(
                                session_id = %session_id,
                                verdict = %verdict.summary_line(),
                                "session complete"
                            );
                        }
                        Err(err) => {
                            error!(session_id = %session_id, error = %err, "verdict persistence failed");
                            bus.publish(DebateEvent::error(
                                session_id.as_str(),
                                format!("verdict persistence failed: {err}"),
                            ));
                        }
                    }
                }
                Err(err) => {
                    warn!(session_id = %session_id, error = %err, "session ended with error");
                    bus.publish(DebateEvent::error(session_id.as_str(), err.to_string()));
                }
            }

            // Stops the watchdog; harmless when already cancelled.
            cancel.cancel();
            bus.close(&session_id);
        }
    }

    /// Cancels the session once the bus has had zero subscribers for
    /// the full grace period. Exits with the session's token.
    fn spawn_watchdog(&self, session_id: &str, cancel: &CancellationToken) {
        let bus = self.bus.clone();
        let cancel = cancel.clone();
        let session_id = session_id.to_string();
        let grace = self.config.subscriber_grace;
        let poll = self.config.watchdog_poll;
        self.tracker.spawn(async move {
            let mut zero_since: Option<tokio::time::Instant> = None;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll) => {}
                }
                if bus.has_subscribers(&session_id) {
                    zero_since = None;
                    continue;
                }
                let since = *zero_since.get_or_insert_with(tokio::time::Instant::now);
                if since.elapsed() >= grace {
                    warn!(
                        session_id = %session_id,
                        grace_secs = grace.as_secs(),
                        "no subscribers within grace period, cancelling session"
                    );
                    cancel.cancel();
                    break;
                }
            }
        });
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<SessionId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Turn sink used by every session: persist first, publish second, so
/// subscribers can treat any event they hear as durable.
struct PersistingSink {
    store: SharedDebateStore,
    bus: SharedEventBus,
}

#[async_trait]
impl TurnSink for PersistingSink {
    async fn deliver(&self, session_id: &str, entry: &DebateTurnEntry) -> anyhow::Result<()> {
        let turn_id = self.store.save_turn(session_id, entry).await?;
        self.bus
            .publish(DebateEvent::log(session_id, turn_id.as_str(), entry.clone()));
        Ok(())
    }
}
