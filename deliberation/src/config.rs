//! Engine tuning knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a debate run.
///
/// The defaults are the production values; tests shrink them to keep
/// scenarios short. All thresholds compare against *completed* rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    /// Hard cap on rounds. Reaching it forces a verdict with no
    /// consensus check.
    pub max_rounds: u32,

    /// Floor below which consensus can never end the debate.
    pub min_rounds: u32,

    /// How many trailing entries the consensus check inspects.
    pub consensus_window: usize,

    /// Average confidence (0-100) required for consensus to conclude
    /// the debate.
    pub confidence_threshold: f64,

    /// Target-price heuristic when the panel says BUY.
    pub buy_target_multiplier: f64,

    /// Target-price heuristic when the panel says SELL.
    pub sell_target_multiplier: f64,

    /// Lower bound on an explicit target price, as a fraction of the
    /// current price. Mentions outside the window are discarded.
    pub target_floor_ratio: f64,

    /// Upper bound on an explicit target price, as a multiple of the
    /// current price.
    pub target_ceiling_ratio: f64,

    /// How long a session may run with zero subscribers before the
    /// watchdog cancels it.
    #[serde(with = "duration_secs")]
    pub subscriber_grace: Duration,

    /// How often the watchdog samples the subscriber count.
    #[serde(with = "duration_secs")]
    pub watchdog_poll: Duration,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            min_rounds: 2,
            consensus_window: 3,
            confidence_threshold: 70.0,
            buy_target_multiplier: 1.15,
            sell_target_multiplier: 0.85,
            target_floor_ratio: 0.3,
            target_ceiling_ratio: 3.0,
            subscriber_grace: Duration::from_secs(300),
            watchdog_poll: Duration::from_secs(15),
        }
    }
}

impl DebateConfig {
    /// Whether `completed` rounds satisfies the hard cap.
    pub fn at_max_rounds(&self, completed: u32) -> bool {
        completed >= self.max_rounds
    }

    /// Whether `completed` rounds is still under the consensus floor.
    pub fn under_min_rounds(&self, completed: u32) -> bool {
        completed < self.min_rounds
    }

    /// Whether an explicit target price is plausible against the
    /// current price. Bounds are inclusive.
    pub fn target_is_plausible(&self, target: f64, current_price: f64) -> bool {
        target >= current_price * self.target_floor_ratio
            && target <= current_price * self.target_ceiling_ratio
    }
}

/// Serialize durations as whole seconds so config files stay readable.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DebateConfig::default();
        assert_eq!(config.max_rounds, 5);
        assert_eq!(config.min_rounds, 2);
        assert_eq!(config.consensus_window, 3);
        assert_eq!(config.confidence_threshold, 70.0);
        assert_eq!(config.subscriber_grace, Duration::from_secs(300));
    }

    #[test]
    fn test_round_guards() {
        let config = DebateConfig::default();
        assert!(!config.at_max_rounds(4));
        assert!(config.at_max_rounds(5));
        assert!(config.under_min_rounds(1));
        assert!(!config.under_min_rounds(2));
    }

    #[test]
    fn test_target_plausibility_window_is_inclusive() {
        let config = DebateConfig::default();
        assert!(config.target_is_plausible(30.0, 100.0));
        assert!(config.target_is_plausible(300.0, 100.0));
        assert!(!config.target_is_plausible(29.99, 100.0));
        assert!(!config.target_is_plausible(300.01, 100.0));
        assert!(config.target_is_plausible(115.0, 100.0));
    }

    #[test]
    fn test_serde_round_trip_keeps_durations() {
        let config = DebateConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: DebateConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.subscriber_grace, Duration::from_secs(300));
        assert_eq!(back.watchdog_poll, Duration::from_secs(15));
    }
}
