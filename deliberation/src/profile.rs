//! Analyst agent profiles and panel membership.
//!
//! An [`AgentProfile`] is the catalog-side description of one analyst:
//! identity, expertise categories, model configuration, and its active
//! prompt spec. Profiles are immutable for the duration of a session; the
//! selector turns a subset of them into [`PanelMember`]s.

use serde::{Deserialize, Serialize};

use crate::facts::FactCategory;

/// Per-agent inference settings passed to the LLM provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name as used in API requests.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelConfig {
    pub fn new(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

/// The prompt pair an agent debates with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSpec {
    /// Persona and ground rules, sent as the system message.
    pub system_prompt: String,
    /// Per-turn instruction with `{fact_sheet}`, `{debate_history}`,
    /// `{turn_number}`, `{agent_name}`, `{symbol}` placeholders.
    pub instruction_template: String,
}

impl PromptSpec {
    pub fn new(
        system_prompt: impl Into<String>,
        instruction_template: impl Into<String>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            instruction_template: instruction_template.into(),
        }
    }
}

/// Catalog entry for one analyst agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Stable identifier, unique within the catalog.
    pub id: String,

    /// Human-readable name used in rendered debate history.
    pub display_name: String,

    /// Short viewpoint tag, e.g. "deep value" or "trend following".
    pub specialization: String,

    /// Fact-sheet categories this agent is strongest on.
    pub expertise: Vec<FactCategory>,

    pub model: ModelConfig,

    /// Inactive agents are never selected.
    pub active: bool,

    /// Tie-break ordering for the deterministic selector; lower wins.
    pub priority: u32,

    /// Active prompt spec. Agents without one cannot join a panel.
    pub prompt: Option<PromptSpec>,
}

impl AgentProfile {
    /// Create an active profile with default model settings and no prompt.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            specialization: String::new(),
            expertise: Vec::new(),
            model: ModelConfig::default(),
            active: true,
            priority: 100,
            prompt: None,
        }
    }

    pub fn with_specialization(mut self, specialization: impl Into<String>) -> Self {
        self.specialization = specialization.into();
        self
    }

    pub fn with_expertise(mut self, expertise: Vec<FactCategory>) -> Self {
        self.expertise = expertise;
        self
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_prompt(mut self, prompt: PromptSpec) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether this agent covers `category`.
    pub fn covers(&self, category: FactCategory) -> bool {
        self.expertise.contains(&category)
    }
}

/// One seat on a debate panel: a profile plus its resolved prompt spec.
///
/// The prompt is duplicated out of the profile so a session keeps a fixed
/// prompt even if the catalog entry is re-edited mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelMember {
    pub profile: AgentProfile,
    pub prompt: PromptSpec,
}

impl PanelMember {
    /// Build a member from a profile, or `None` if it has no active prompt.
    pub fn attach(profile: &AgentProfile) -> Option<Self> {
        let prompt = profile.prompt.clone()?;
        Some(Self {
            profile: profile.clone(),
            prompt,
        })
    }
}
