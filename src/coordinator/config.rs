//! Coordinator Configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::action::KindProfile;
use crate::conflict::{ConflictKind, StrategyKind, DEFAULT_CONFLICT_THRESHOLD};
use crate::collaboration::{DEFAULT_SYNERGY_THRESHOLD, DEFAULT_TRIPLE_AFFINITY_THRESHOLD};
use crate::error::{CoordError, Result};

/// Configuration for the coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Per-agent bound on the decision call (ms)
    pub decision_timeout_ms: u64,
    /// Per-action bound on execution (ms)
    pub action_timeout_ms: u64,
    /// Minimum severity for a conflict to be emitted
    pub conflict_threshold: f64,
    /// Minimum synergy for an opportunity to be materialized
    pub synergy_threshold: f64,
    /// Every member of a triple needs at least this affinity
    pub triple_affinity_threshold: f64,
    pub completed_history_limit: usize,
    pub resolved_history_limit: usize,
    pub round_history_limit: usize,
    pub collaboration_history_limit: usize,
    /// Replaces the built-in candidate list for a conflict kind.
    /// An empty list means the random fallback.
    pub strategy_overrides: HashMap<ConflictKind, Vec<StrategyKind>>,
    /// Heuristic profile replacements keyed by action type
    pub heuristics: HashMap<String, KindProfile>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            decision_timeout_ms: 10_000,
            action_timeout_ms: 30_000,
            conflict_threshold: DEFAULT_CONFLICT_THRESHOLD,
            synergy_threshold: DEFAULT_SYNERGY_THRESHOLD,
            triple_affinity_threshold: DEFAULT_TRIPLE_AFFINITY_THRESHOLD,
            completed_history_limit: 1000,
            resolved_history_limit: 500,
            round_history_limit: 100,
            collaboration_history_limit: 200,
            strategy_overrides: HashMap::new(),
            heuristics: HashMap::new(),
        }
    }
}

impl CoordinatorConfig {
    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.decision_timeout_ms == 0 {
            return Err(CoordError::InvalidConfig(
                "decision_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.action_timeout_ms == 0 {
            return Err(CoordError::InvalidConfig(
                "action_timeout_ms must be greater than 0".into(),
            ));
        }

        for (name, value) in [
            ("conflict_threshold", self.conflict_threshold),
            ("synergy_threshold", self.synergy_threshold),
            ("triple_affinity_threshold", self.triple_affinity_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CoordError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        for (name, value) in [
            ("completed_history_limit", self.completed_history_limit),
            ("resolved_history_limit", self.resolved_history_limit),
            ("round_history_limit", self.round_history_limit),
            ("collaboration_history_limit", self.collaboration_history_limit),
        ] {
            if value == 0 {
                return Err(CoordError::InvalidConfig(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        for (name, profile) in &self.heuristics {
            if !(0.0..=1.0).contains(&profile.affinity)
                || !(0.0..=1.0).contains(&profile.conflict_risk)
            {
                return Err(CoordError::InvalidConfig(format!(
                    "heuristics.{}: affinity and conflict_risk must be within [0, 1]",
                    name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CoordinatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.decision_timeout(), Duration::from_secs(10));
        assert_eq!(config.action_timeout(), Duration::from_secs(30));
        assert_eq!(config.conflict_threshold, 0.3);
        assert_eq!(config.synergy_threshold, 0.6);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let mut config = CoordinatorConfig::default();
        config.synergy_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(CoordError::InvalidConfig(msg)) if msg.starts_with("synergy_threshold")
        ));

        let mut config = CoordinatorConfig::default();
        config.action_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = CoordinatorConfig::default();
        config.round_history_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_deserialize() {
        let raw = r#"{
            "decision_timeout_ms": 250,
            "strategy_overrides": { "location": ["sequential"], "social": [] },
            "heuristics": { "gather": { "resources": ["basket"], "affinity": 0.5 } }
        }"#;
        let config: CoordinatorConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(config.decision_timeout_ms, 250);
        assert_eq!(config.action_timeout_ms, 30_000);
        assert_eq!(
            config.strategy_overrides[&ConflictKind::Location],
            vec![StrategyKind::Sequential]
        );
        assert!(config.strategy_overrides[&ConflictKind::Social].is_empty());
        assert_eq!(config.heuristics["gather"].resources, vec!["basket"]);
        assert!(config.validate().is_ok());
    }
}
