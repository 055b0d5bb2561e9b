//! Token usage normalization.
//!
//! Providers report token counts in different places and spellings. The
//! accountant tries a fixed list of known shapes in order and returns the
//! first match; an unknown shape yields all zeros rather than an error, so
//! missing usage data can never abort a debate round.

use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

/// Normalized token counts for one call (or a running sum of calls).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub total: u64,
    pub prompt: u64,
    pub completion: u64,
}

impl TokenUsage {
    pub fn new(total: u64, prompt: u64, completion: u64) -> Self {
        Self {
            total,
            prompt,
            completion,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.total == 0 && self.prompt == 0 && self.completion == 0
    }

    /// Sum usage across turns.
    pub fn sum<'a>(items: impl IntoIterator<Item = &'a TokenUsage>) -> TokenUsage {
        items
            .into_iter()
            .fold(TokenUsage::default(), |acc, u| acc + *u)
    }
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage {
            total: self.total + rhs.total,
            prompt: self.prompt + rhs.prompt,
            completion: self.completion + rhs.completion,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: TokenUsage) {
        *self = *self + rhs;
    }
}

type Extractor = fn(&Value) -> Option<TokenUsage>;

/// Known payload shapes, tried in order; first present wins.
const EXTRACTORS: &[(&str, Extractor)] = &[
    ("usage_metadata", extract_usage_metadata),
    ("response_metadata.tokenUsage", extract_token_usage),
    ("response_metadata.usage", extract_response_usage),
];

fn count(node: &Value, key: &str) -> u64 {
    node.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn extract_usage_metadata(payload: &Value) -> Option<TokenUsage> {
    let node = payload.get("usage_metadata")?;
    Some(TokenUsage {
        prompt: count(node, "input_tokens"),
        completion: count(node, "output_tokens"),
        total: count(node, "total_tokens"),
    })
}

fn extract_token_usage(payload: &Value) -> Option<TokenUsage> {
    let node = payload.get("response_metadata")?.get("tokenUsage")?;
    Some(TokenUsage {
        prompt: count(node, "promptTokens"),
        completion: count(node, "completionTokens"),
        total: count(node, "totalTokens"),
    })
}

fn extract_response_usage(payload: &Value) -> Option<TokenUsage> {
    let node = payload.get("response_metadata")?.get("usage")?;
    Some(TokenUsage {
        prompt: count(node, "prompt_tokens"),
        completion: count(node, "completion_tokens"),
        total: count(node, "total_tokens"),
    })
}

/// Normalize the usage reported in a raw provider payload.
pub fn extract_usage(payload: &Value) -> TokenUsage {
    for (shape, extract) in EXTRACTORS {
        if let Some(usage) = extract(payload) {
            trace!(shape, total = usage.total, "Extracted token usage");
            return usage;
        }
    }
    trace!("No known usage shape in payload");
    TokenUsage::default()
}
