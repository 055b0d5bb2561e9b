//! Session event streams.
//!
//! Three per-session streams (`log`, `complete`, `error`) over tokio
//! broadcast channels. `log` carries each turn as it is persisted;
//! `complete` and `error` are terminal and are followed by channel
//! teardown. Subscribers that arrive late read history from the store.

pub mod bus;
pub mod types;

pub use bus::{BusError, EventBus, SharedEventBus};
pub use types::{DebateEvent, EventKind};
