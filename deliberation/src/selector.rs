//! Panel selection.
//!
//! Picks which analysts debate a symbol. Small pools skip straight to
//! "everyone eligible". Larger pools ask a model to compose the panel
//! from a summary of the sheet and the candidate roster; anything wrong
//! with that path (transport, malformed ids, too few valid picks)
//! degrades to a deterministic expertise scorer. Selection never aborts
//! a session.

use thiserror::Error;
use tracing::{debug, warn};

use crate::facts::{FactCategory, FactSheet};
use crate::profile::{AgentProfile, ModelConfig, PanelMember};
use crate::provider::{ProviderError, SharedLlmProvider};

const SELECTION_SYSTEM_PROMPT: &str = r#"You assemble analyst panels for stock debates.
Given the data available for a symbol and a roster of candidate analysts,
pick the panel best positioned to argue the symbol from genuinely
different angles. Favor complementary and contrasting viewpoints over
redundant ones, and vary your picks across repeated requests so panels
do not fossilize. Reply with a JSON array of candidate ids and nothing
else."#;

/// Errors on the model-assisted selection path. Callers of
/// [`AgentSelector::select_panel`] never see these; they trigger the
/// fallback scorer.
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("no candidate-id array in selection reply: {0}")]
    Parse(String),
}

/// Chooses a debate panel from the agent catalog.
pub struct AgentSelector {
    provider: SharedLlmProvider,
    model: ModelConfig,
}

impl AgentSelector {
    pub fn new(provider: SharedLlmProvider) -> Self {
        Self {
            provider,
            model: ModelConfig::default(),
        }
    }

    /// Override the model used for selection calls.
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    /// Select up to `target_size` panel members for `facts`.
    ///
    /// Only active candidates with a prompt spec are eligible. When the
    /// eligible pool is no larger than the target the whole pool is
    /// seated and no model call happens.
    pub async fn select_panel(
        &self,
        facts: &FactSheet,
        candidates: &[AgentProfile],
        target_size: usize,
    ) -> Vec<PanelMember> {
        let eligible: Vec<&AgentProfile> = candidates
            .iter()
            .filter(|profile| profile.active && profile.prompt.is_some())
            .collect();

        if eligible.len() <= target_size {
            debug!(
                symbol = %facts.symbol,
                eligible = eligible.len(),
                target_size,
                "seating entire eligible pool"
            );
            return eligible
                .into_iter()
                .filter_map(PanelMember::attach)
                .collect();
        }

        match self.model_panel(facts, &eligible, target_size).await {
            Ok(panel) if panel.len() == target_size => {
                debug!(symbol = %facts.symbol, target_size, "panel selected by model");
                panel
            }
            Ok(panel) => {
                warn!(
                    symbol = %facts.symbol,
                    valid = panel.len(),
                    target_size,
                    "model picked too few valid panelists, scoring instead"
                );
                fallback_panel(facts, &eligible, target_size)
            }
            Err(err) => {
                warn!(
                    symbol = %facts.symbol,
                    error = %err,
                    "panel selection call failed, scoring instead"
                );
                fallback_panel(facts, &eligible, target_size)
            }
        }
    }

    /// Ask the model for `target_size` candidate ids and map them back
    /// to eligible profiles, dropping unknowns and duplicates.
    async fn model_panel(
        &self,
        facts: &FactSheet,
        eligible: &[&AgentProfile],
        target_size: usize,
    ) -> Result<Vec<PanelMember>, SelectorError> {
        let prompt = selection_prompt(facts, eligible, target_size);
        let response = self
            .provider
            .complete(SELECTION_SYSTEM_PROMPT, &prompt, &self.model)
            .await?;
        let ids = parse_id_array(&response.text)?;

        let mut panel: Vec<PanelMember> = Vec::new();
        for id in ids {
            if panel.iter().any(|member| member.profile.id == id) {
                continue;
            }
            if let Some(profile) = eligible.iter().find(|profile| profile.id == id) {
                if let Some(member) = PanelMember::attach(profile) {
                    panel.push(member);
                }
            }
            if panel.len() == target_size {
                break;
            }
        }
        Ok(panel)
    }
}

/// Roster summary the selection model sees.
fn selection_prompt(facts: &FactSheet, eligible: &[&AgentProfile], target_size: usize) -> String {
    let populated = facts
        .populated_categories()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let populated = if populated.is_empty() {
        "none".to_string()
    } else {
        populated
    };

    let mut out = format!(
        "Symbol: {}\nPopulated fact categories: {populated}\n\nCandidates:\n",
        facts.symbol
    );
    for profile in eligible {
        let expertise = profile
            .expertise
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "- {}: {} | expertise: {expertise}\n",
            profile.id, profile.specialization
        ));
    }
    out.push_str(&format!(
        "\nPick exactly {target_size} candidate ids as a JSON array."
    ));
    out
}

/// Extract a `["id", ...]` array from the reply text.
fn parse_id_array(text: &str) -> Result<Vec<String>, SelectorError> {
    let start = text
        .find('[')
        .ok_or_else(|| SelectorError::Parse(preview(text)))?;
    let end = text
        .rfind(']')
        .filter(|end| *end > start)
        .ok_or_else(|| SelectorError::Parse(preview(text)))?;
    serde_json::from_str(&text[start..=end]).map_err(|e| SelectorError::Parse(e.to_string()))
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}

/// Deterministic scorer: expertise matched against populated categories,
/// with a bonus for valuation coverage when an intrinsic-value estimate
/// exists. Ties go to the lower priority number.
fn fallback_panel(
    facts: &FactSheet,
    eligible: &[&AgentProfile],
    target_size: usize,
) -> Vec<PanelMember> {
    let mut scored: Vec<(u32, &AgentProfile)> = eligible
        .iter()
        .map(|profile| (score_candidate(facts, profile), *profile))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.priority.cmp(&b.1.priority)));
    scored
        .into_iter()
        .take(target_size)
        .filter_map(|(_, profile)| PanelMember::attach(profile))
        .collect()
}

fn score_candidate(facts: &FactSheet, profile: &AgentProfile) -> u32 {
    let mut score = 0;
    for category in &profile.expertise {
        if facts.has_category_data(*category) {
            score += 10;
        }
    }
    if profile.covers(FactCategory::Valuation) && facts.valuation.intrinsic_value.is_some() {
        score += 5;
    }
    score
}
