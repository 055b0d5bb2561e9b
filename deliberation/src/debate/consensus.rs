//! Consensus detection over the trailing debate window.
//!
//! All functions here are pure: they read session state and config and
//! return a decision, leaving transitions and I/O to the engine.

use serde::{Deserialize, Serialize};

use crate::config::DebateConfig;
use crate::debate::state::{DebateTurnEntry, Decision, SessionState};

/// What the machine should do after a consensus check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    /// Loop back for another round.
    Continue,
    /// Move to verdict synthesis.
    Conclude,
}

impl std::fmt::Display for NextStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NextStep::Continue => write!(f, "continue"),
            NextStep::Conclude => write!(f, "conclude"),
        }
    }
}

/// Outcome of assessing one completed round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundAssessment {
    /// Whether the trailing window agreed on one decision.
    pub consensus: bool,

    /// Mean confidence over the last panel-sized window of entries,
    /// with missing values counted as 50.
    pub average_confidence: f64,

    pub next: NextStep,

    /// Becomes the recorded transition reason.
    pub reason: String,
}

/// Decision implied by an entry.
///
/// The structured field wins when present; otherwise the message is
/// scanned case-insensitively for BUY, then SELL, then HOLD as
/// substrings. Containment priority, not position, breaks overlaps.
pub fn implied_decision(entry: &DebateTurnEntry) -> Option<Decision> {
    if let Some(decision) = entry.decision {
        return Some(decision);
    }
    let lower = entry.message.to_ascii_lowercase();
    for (token, decision) in [
        ("buy", Decision::Buy),
        ("sell", Decision::Sell),
        ("hold", Decision::Hold),
    ] {
        if lower.contains(token) {
            return Some(decision);
        }
    }
    None
}

/// Whether the most recent `window` entries imply exactly one distinct
/// decision. Unclassifiable entries are ignored; an all-unclassifiable
/// window is not consensus.
pub fn window_consensus(entries: &[DebateTurnEntry], window: usize) -> bool {
    let tail = last_entries(entries, window);
    let mut seen: Option<Decision> = None;
    for entry in tail {
        match (implied_decision(entry), seen) {
            (None, _) => {}
            (Some(d), None) => seen = Some(d),
            (Some(d), Some(prior)) if d != prior => return false,
            (Some(_), Some(_)) => {}
        }
    }
    seen.is_some()
}

/// Mean confidence over the most recent `window` entries, counting a
/// missing confidence as 50. Returns 0 for an empty window.
pub fn average_confidence(entries: &[DebateTurnEntry], window: usize) -> f64 {
    let tail = last_entries(entries, window);
    if tail.is_empty() {
        return 0.0;
    }
    let sum: u32 = tail
        .iter()
        .map(|entry| u32::from(entry.confidence.unwrap_or(50)))
        .sum();
    f64::from(sum) / tail.len() as f64
}

/// Decide whether the debate continues after the round `session.turn`.
///
/// Callers apply the max-rounds bypass before checking consensus; this
/// only weighs the minimum-round floor, window agreement, and the
/// confidence threshold.
pub fn assess_round(session: &SessionState, config: &DebateConfig) -> RoundAssessment {
    let completed = session.turn;
    let consensus = window_consensus(&session.entries, config.consensus_window);
    let average_confidence = average_confidence(&session.entries, session.panel_size());

    if config.under_min_rounds(completed) {
        return RoundAssessment {
            consensus,
            average_confidence,
            next: NextStep::Continue,
            reason: format!(
                "round {completed} below minimum of {}",
                config.min_rounds
            ),
        };
    }

    if consensus && average_confidence >= config.confidence_threshold {
        return RoundAssessment {
            consensus,
            average_confidence,
            next: NextStep::Conclude,
            reason: format!("consensus at {average_confidence:.0}% average confidence"),
        };
    }

    let reason = if consensus {
        format!(
            "consensus below {:.0}% confidence threshold",
            config.confidence_threshold
        )
    } else {
        format!("no consensus after round {completed}")
    };
    RoundAssessment {
        consensus,
        average_confidence,
        next: NextStep::Continue,
        reason,
    }
}

fn last_entries(entries: &[DebateTurnEntry], n: usize) -> &[DebateTurnEntry] {
    let start = entries.len().saturating_sub(n);
    &entries[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FactSheet;
    use crate::profile::{AgentProfile, PanelMember, PromptSpec};

    fn entry(message: &str) -> DebateTurnEntry {
        DebateTurnEntry::new("a", "A", 1, message)
    }

    fn voted(decision: Decision, confidence: u8) -> DebateTurnEntry {
        entry("x").with_decision(decision, confidence)
    }

    fn session(panel_size: usize, turn: u32, entries: Vec<DebateTurnEntry>) -> SessionState {
        let panel = (0..panel_size)
            .map(|i| {
                let profile = AgentProfile::new(format!("a{i}"), format!("A{i}"))
                    .with_prompt(PromptSpec::new("sys", "inst"));
                PanelMember::attach(&profile).unwrap()
            })
            .collect();
        let mut state = SessionState::new("s-1", "ACME", FactSheet::new("ACME"), panel);
        state.turn = turn;
        for e in entries {
            state.record_turn(e);
        }
        state
    }

    // --- implied_decision ---

    #[test]
    fn test_structured_field_wins_over_text() {
        let e = entry("everyone should buy").with_decision(Decision::Sell, 60);
        assert_eq!(implied_decision(&e), Some(Decision::Sell));
    }

    #[test]
    fn test_substring_fallback_checks_buy_first() {
        assert_eq!(
            implied_decision(&entry("tempting to sell, but I would buy")),
            Some(Decision::Buy)
        );
        assert_eq!(
            implied_decision(&entry("SELL into strength, never hold")),
            Some(Decision::Sell)
        );
        assert_eq!(
            implied_decision(&entry("holding pattern for now")),
            Some(Decision::Hold)
        );
    }

    #[test]
    fn test_unclassifiable_message() {
        assert_eq!(implied_decision(&entry("the data is inconclusive")), None);
    }

    // --- window_consensus ---

    #[test]
    fn test_unanimous_window_is_consensus() {
        let entries = vec![voted(Decision::Buy, 80); 3];
        assert!(window_consensus(&entries, 3));
    }

    #[test]
    fn test_split_window_is_not_consensus() {
        let entries = vec![
            voted(Decision::Buy, 80),
            voted(Decision::Buy, 80),
            voted(Decision::Sell, 80),
        ];
        assert!(!window_consensus(&entries, 3));
    }

    #[test]
    fn test_unclassifiable_entries_are_ignored() {
        let entries = vec![
            voted(Decision::Buy, 80),
            entry("no view either way"),
            voted(Decision::Buy, 70),
        ];
        assert!(window_consensus(&entries, 3));
    }

    #[test]
    fn test_all_unclassifiable_is_not_consensus() {
        let entries = vec![entry("hmm"), entry("unclear"), entry("more data needed")];
        assert!(!window_consensus(&entries, 3));
    }

    #[test]
    fn test_window_looks_at_most_recent_entries() {
        let entries = vec![
            voted(Decision::Sell, 80),
            voted(Decision::Buy, 80),
            voted(Decision::Buy, 80),
            voted(Decision::Buy, 80),
        ];
        assert!(window_consensus(&entries, 3));
        assert!(!window_consensus(&entries, 4));
    }

    // --- average_confidence ---

    #[test]
    fn test_average_counts_missing_as_fifty() {
        let entries = vec![
            voted(Decision::Buy, 80),
            entry("no numbers here"),
            voted(Decision::Buy, 70),
        ];
        let avg = average_confidence(&entries, 3);
        assert!((avg - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_of_empty_window() {
        assert_eq!(average_confidence(&[], 3), 0.0);
    }

    // --- assess_round ---

    #[test]
    fn test_unanimity_under_min_rounds_continues() {
        let state = session(3, 1, vec![voted(Decision::Buy, 90); 3]);
        let assessment = assess_round(&state, &DebateConfig::default());
        assert!(assessment.consensus);
        assert_eq!(assessment.next, NextStep::Continue);
        assert!(assessment.reason.contains("below minimum"));
    }

    #[test]
    fn test_confident_consensus_concludes() {
        let state = session(3, 2, vec![voted(Decision::Buy, 80); 6]);
        let assessment = assess_round(&state, &DebateConfig::default());
        assert!(assessment.consensus);
        assert_eq!(assessment.next, NextStep::Conclude);
        assert_eq!(assessment.average_confidence, 80.0);
    }

    #[test]
    fn test_timid_consensus_continues() {
        let state = session(3, 2, vec![voted(Decision::Hold, 55); 6]);
        let assessment = assess_round(&state, &DebateConfig::default());
        assert!(assessment.consensus);
        assert_eq!(assessment.next, NextStep::Continue);
        assert!(assessment.reason.contains("confidence threshold"));
    }

    #[test]
    fn test_disagreement_continues() {
        let mut entries = vec![voted(Decision::Buy, 90); 5];
        entries.push(voted(Decision::Sell, 90));
        let state = session(3, 2, entries);
        let assessment = assess_round(&state, &DebateConfig::default());
        assert!(!assessment.consensus);
        assert_eq!(assessment.next, NextStep::Continue);
    }
}
