//! Final verdict synthesis.
//!
//! The verdict is computed from the last full round only: earlier rounds
//! already shaped those closing statements through the rendered history,
//! so re-counting them would double-weight stale positions.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DebateConfig;
use crate::debate::consensus::implied_decision;
use crate::debate::state::{DebateTurnEntry, Decision, SessionState};

/// Matches "target ... $N" and "price target ... $N" mentions. The gap is
/// bounded so a dollar figure from an unrelated clause is not attributed
/// to the word "target".
static TARGET_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:price\s+)?target[^$\n]{0,40}\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)").unwrap()
});

/// The synthesized outcome of one debate session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub decision: Decision,

    /// Price objective. `None` when the sheet carried no current price.
    pub target_price: Option<f64>,

    /// Vote share of the winning decision, 0-100.
    pub confidence: u8,

    /// Newline-joined `<agent>: <message>` lines from the tallied round.
    pub reasoning: String,
}

impl Verdict {
    /// Placeholder persisted at session start, before any turn runs.
    pub fn provisional() -> Self {
        Self {
            decision: Decision::Hold,
            target_price: None,
            confidence: 0,
            reasoning: String::new(),
        }
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        match self.target_price {
            Some(target) => format!(
                "{} ({}%) target ${:.2}",
                self.decision, self.confidence, target
            ),
            None => format!("{} ({}%)", self.decision, self.confidence),
        }
    }
}

/// Synthesize a verdict from the session's last full round.
///
/// Zero classifiable votes degrade to HOLD at confidence 50 rather than
/// failing; a session that produced entries always gets a verdict.
pub fn synthesize_verdict(session: &SessionState, config: &DebateConfig) -> Verdict {
    let round = last_entries(&session.entries, session.panel_size());

    let mut tally: HashMap<Decision, usize> = HashMap::new();
    for entry in round {
        if let Some(decision) = implied_decision(entry) {
            *tally.entry(decision).or_insert(0) += 1;
        }
    }
    let total: usize = tally.values().sum();

    let (decision, confidence) = if total == 0 {
        (Decision::Hold, 50)
    } else {
        // Strict > keeps the first of Decision::ALL on ties.
        let mut winner = Decision::Hold;
        let mut best = 0usize;
        for candidate in Decision::ALL {
            let count = tally.get(&candidate).copied().unwrap_or(0);
            if count > best {
                winner = candidate;
                best = count;
            }
        }
        let share = (best as f64 / total as f64 * 100.0).round() as u8;
        (winner, share)
    };

    let target_price = session.facts.current_price.map(|price| {
        let explicit = explicit_targets(round, price, config);
        if explicit.is_empty() {
            match decision {
                Decision::Buy => price * config.buy_target_multiplier,
                Decision::Sell => price * config.sell_target_multiplier,
                Decision::Hold => price,
            }
        } else {
            explicit.iter().sum::<f64>() / explicit.len() as f64
        }
    });

    let reasoning = round
        .iter()
        .map(|entry| format!("{}: {}", entry.agent_name, entry.message))
        .collect::<Vec<_>>()
        .join("\n");

    debug!(
        session_id = %session.id,
        %decision,
        confidence,
        votes = total,
        "verdict synthesized"
    );

    Verdict {
        decision,
        target_price,
        confidence,
        reasoning,
    }
}

/// Plausible explicit target-price mentions across the round's messages.
fn explicit_targets(
    entries: &[DebateTurnEntry],
    current_price: f64,
    config: &DebateConfig,
) -> Vec<f64> {
    let mut accepted = Vec::new();
    for entry in entries {
        for capture in TARGET_PRICE.captures_iter(&entry.message) {
            let raw = capture[1].replace(',', "");
            if let Ok(value) = raw.parse::<f64>() {
                if config.target_is_plausible(value, current_price) {
                    accepted.push(value);
                }
            }
        }
    }
    accepted
}

fn last_entries(entries: &[DebateTurnEntry], n: usize) -> &[DebateTurnEntry] {
    let start = entries.len().saturating_sub(n);
    &entries[start..]
}
