//! Edge configuration: environment defaults, optional TOML file, and
//! whatever the CLI overrides on top.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use deliberation::ModelConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for the provider client and the demo binary.
///
/// `Default` reads the `ANALYST_*` environment; a TOML file overlays
/// it field by field; CLI flags overwrite last.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Base URL of an OpenAI-compatible API, without the endpoint path.
    pub base_url: String,
    /// Bearer token. Absent means unauthenticated (local servers).
    pub api_key: Option<String>,
    /// Model name passed through to the backend.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// How many analysts the selector should seat.
    pub panel_size: usize,
    /// Optional JSON file of fact sheets replacing the built-in demo set.
    pub facts_file: Option<PathBuf>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("ANALYST_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: std::env::var("ANALYST_API_KEY").ok(),
            model: std::env::var("ANALYST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            temperature: 0.7,
            max_tokens: 1024,
            panel_size: 4,
            facts_file: None,
        }
    }
}

impl AgentsConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// File config when a path is given, environment defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// The per-call model settings handed to the provider.
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig::new(self.model.clone(), self.temperature, self.max_tokens)
    }
}
