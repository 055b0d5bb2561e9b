//! LLM inference provider seam.
//!
//! The engine never talks HTTP itself. Everything that needs a model call
//! (debate turns, panel selection) goes through [`LlmProvider::complete`],
//! implemented by a concrete client crate. The raw provider payload rides
//! along so the token accountant can normalize usage regardless of shape.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::profile::ModelConfig;

/// One completion result: the assistant text plus the raw provider payload.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,
    /// Untouched provider response body, used for token accounting.
    pub payload: Value,
}

impl ProviderResponse {
    pub fn new(text: impl Into<String>, payload: Value) -> Self {
        Self {
            text: text.into(),
            payload,
        }
    }

    /// A response with no usage information attached.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            payload: Value::Null,
        }
    }
}

/// Errors surfaced by provider clients.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

/// Single-operation completion interface.
///
/// Retry policy, rate limiting, and model lifecycle belong to the
/// implementation, not to callers. A returned error is final for the call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &ModelConfig,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// Shared provider handle.
pub type SharedLlmProvider = Arc<dyn LlmProvider>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::Status {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "provider returned status 429: rate limited");
        assert_eq!(
            ProviderError::Transport("timeout".to_string()).to_string(),
            "transport error: timeout"
        );
    }

    #[test]
    fn test_text_only_has_null_payload() {
        let resp = ProviderResponse::text_only("HOLD");
        assert_eq!(resp.text, "HOLD");
        assert!(resp.payload.is_null());
    }
}
