//! Per-session event bus.
//!
//! A registry of session id -> one tokio broadcast channel per event
//! kind. Channel sets live from [`EventBus::open`] until
//! [`EventBus::close`]; closing drops the senders, so subscribers
//! drain whatever is buffered and then see the stream end. There is no
//! replay: a late subscriber reads history from the store instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use super::types::{DebateEvent, EventKind};
use crate::debate::state::SessionId;

/// Buffered events per kind before a slow subscriber starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Error type for event bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("no event channels for session: {0}")]
    UnknownSession(SessionId),
}

/// Shared reference to an EventBus.
pub type SharedEventBus = Arc<EventBus>;

/// One broadcast sender per event kind.
struct ChannelSet {
    log: broadcast::Sender<DebateEvent>,
    complete: broadcast::Sender<DebateEvent>,
    error: broadcast::Sender<DebateEvent>,
}

impl ChannelSet {
    fn new() -> Self {
        let (log, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (complete, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (error, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            log,
            complete,
            error,
        }
    }

    fn sender(&self, kind: EventKind) -> &broadcast::Sender<DebateEvent> {
        match kind {
            EventKind::Log => &self.log,
            EventKind::Complete => &self.complete,
            EventKind::Error => &self.error,
        }
    }

    fn receiver_count(&self) -> usize {
        EventKind::ALL
            .iter()
            .map(|kind| self.sender(*kind).receiver_count())
            .sum()
    }
}

/// Session-scoped pub/sub.
///
/// All methods take `&self`; the registry mutex is the only shared
/// state and is never held across an await.
pub struct EventBus {
    channels: Mutex<HashMap<SessionId, ChannelSet>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Create a shared reference to this event bus.
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Create the channel set for a session. Idempotent: reopening an
    /// open session keeps the existing channels and their subscribers.
    pub fn open(&self, session_id: &str) {
        let mut channels = self.registry();
        if channels.contains_key(session_id) {
            debug!(session_id, "event channels already open");
            return;
        }
        channels.insert(session_id.to_string(), ChannelSet::new());
        debug!(session_id, "event channels opened");
    }

    /// Subscribe to one kind of event for a session. Dropping the
    /// receiver unsubscribes.
    pub fn subscribe(
        &self,
        session_id: &str,
        kind: EventKind,
    ) -> Result<broadcast::Receiver<DebateEvent>, BusError> {
        let channels = self.registry();
        let set = channels
            .get(session_id)
            .ok_or_else(|| BusError::UnknownSession(session_id.to_string()))?;
        debug!(session_id, %kind, "subscriber attached");
        Ok(set.sender(kind).subscribe())
    }

    /// Publish to the event's session and kind. Fire-and-forget: zero
    /// receivers and already-closed sessions are both fine.
    pub fn publish(&self, event: DebateEvent) {
        let kind = event.kind();
        let channels = self.registry();
        let Some(set) = channels.get(event.session_id()) else {
            debug!(session_id = event.session_id(), %kind, "event dropped, channels closed");
            return;
        };
        match set.sender(kind).send(event) {
            Ok(receivers) => debug!(%kind, receivers, "event published"),
            // send only fails when no receiver exists, which is fine.
            Err(_) => debug!(%kind, "event published (no receivers)"),
        }
    }

    /// Tear down a session's channels. Buffered events stay readable in
    /// existing receivers; after draining they observe closure.
    pub fn close(&self, session_id: &str) {
        if self.registry().remove(session_id).is_some() {
            debug!(session_id, "event channels closed");
        }
    }

    /// Live receivers across all kinds for a session. Zero for unknown
    /// sessions.
    pub fn subscriber_count(&self, session_id: &str) -> usize {
        self.registry()
            .get(session_id)
            .map(ChannelSet::receiver_count)
            .unwrap_or(0)
    }

    pub fn has_subscribers(&self, session_id: &str) -> bool {
        self.subscriber_count(session_id) > 0
    }

    /// Whether a session's channels are currently open.
    pub fn is_open(&self, session_id: &str) -> bool {
        self.registry().contains_key(session_id)
    }

    /// A poisoned registry only means a panic elsewhere mid-operation;
    /// the map itself is still usable, so recover it.
    fn registry(&self) -> MutexGuard<'_, HashMap<SessionId, ChannelSet>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::state::DebateTurnEntry;

    fn log_event(session_id: &str, turn_id: &str) -> DebateEvent {
        DebateEvent::log(
            session_id,
            turn_id,
            DebateTurnEntry::new("a", "A", 1, "msg"),
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = EventBus::new();
        bus.open("s-1");
        let mut rx = bus.subscribe("s-1", EventKind::Log).unwrap();

        bus.publish(log_event("s-1", "t-1"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.session_id(), "s-1");
        assert_eq!(event.kind(), EventKind::Log);
    }

    #[tokio::test]
    async fn test_kinds_are_independent_streams() {
        let bus = EventBus::new();
        bus.open("s-1");
        let mut log_rx = bus.subscribe("s-1", EventKind::Log).unwrap();
        let mut err_rx = bus.subscribe("s-1", EventKind::Error).unwrap();

        bus.publish(DebateEvent::error("s-1", "boom"));

        assert!(matches!(
            log_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
        assert_eq!(err_rx.recv().await.unwrap().kind(), EventKind::Error);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let bus = EventBus::new();
        bus.open("s-1");
        bus.open("s-2");
        let mut rx_other = bus.subscribe("s-2", EventKind::Log).unwrap();

        bus.publish(log_event("s-1", "t-1"));

        assert!(matches!(
            rx_other.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn test_publish_without_subscribers_or_session() {
        let bus = EventBus::new();
        bus.open("s-1");
        // No receivers attached.
        bus.publish(log_event("s-1", "t-1"));
        // Channels never opened.
        bus.publish(log_event("ghost", "t-1"));
    }

    #[tokio::test]
    async fn test_close_drains_then_ends_stream() {
        let bus = EventBus::new();
        bus.open("s-1");
        let mut rx = bus.subscribe("s-1", EventKind::Log).unwrap();

        bus.publish(log_event("s-1", "t-1"));
        bus.publish(log_event("s-1", "t-2"));
        bus.close("s-1");
        assert!(!bus.is_open("s-1"));

        assert!(rx.recv().await.is_ok());
        assert!(rx.recv().await.is_ok());
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[test]
    fn test_subscribe_unknown_session() {
        let bus = EventBus::new();
        let err = bus.subscribe("nope", EventKind::Log).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_subscriber_count_tracks_receiver_drops() {
        let bus = EventBus::new();
        bus.open("s-1");
        assert_eq!(bus.subscriber_count("s-1"), 0);

        let rx1 = bus.subscribe("s-1", EventKind::Log).unwrap();
        let rx2 = bus.subscribe("s-1", EventKind::Complete).unwrap();
        assert_eq!(bus.subscriber_count("s-1"), 2);
        assert!(bus.has_subscribers("s-1"));

        drop(rx1);
        assert_eq!(bus.subscriber_count("s-1"), 1);
        drop(rx2);
        assert!(!bus.has_subscribers("s-1"));
        assert_eq!(bus.subscriber_count("ghost"), 0);
    }

    #[test]
    fn test_reopen_keeps_existing_channels() {
        let bus = EventBus::new();
        bus.open("s-1");
        let rx = bus.subscribe("s-1", EventKind::Log).unwrap();
        bus.open("s-1");
        assert_eq!(bus.subscriber_count("s-1"), 1);
        drop(rx);
    }
}
