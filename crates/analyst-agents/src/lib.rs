//! Concrete edge for the deliberation engine: the default analyst
//! roster, an OpenAI-compatible provider client, a static fact-sheet
//! source, and the configuration the demo binary layers together.

pub mod catalog;
pub mod client;
pub mod config;
pub mod facts_source;

pub use catalog::default_catalog;
pub use client::OpenAiChatClient;
pub use config::{AgentsConfig, ConfigError};
pub use facts_source::{SourceError, StaticFactSheets};
