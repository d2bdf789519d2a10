//! Heuristic lookup tables
//!
//! Scoring is driven by fixed per-kind tables instead of free-text inference.
//! Tables are versioned; deployments override individual kinds through
//! `CoordinatorConfig::heuristics`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::{ActionKind, PriorityClass};

/// Bump when any built-in table entry changes
pub const HEURISTICS_VERSION: u32 = 1;

pub const DEFAULT_PRIORITY: PriorityClass = PriorityClass::Low;
pub const DEFAULT_AFFINITY: f64 = 0.3;
pub const DEFAULT_CONFLICT_RISK: f64 = 0.2;
pub const DEFAULT_DURATION_SECS: f64 = 1.0;

/// Scoring profile for one action kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindProfile {
    /// Resources the kind always needs, in addition to explicit ones
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: PriorityClass,
    #[serde(default = "default_affinity")]
    pub affinity: f64,
    #[serde(default = "default_conflict_risk")]
    pub conflict_risk: f64,
    #[serde(default = "default_duration_secs")]
    pub duration_secs: f64,
}

fn default_priority() -> PriorityClass {
    DEFAULT_PRIORITY
}

fn default_affinity() -> f64 {
    DEFAULT_AFFINITY
}

fn default_conflict_risk() -> f64 {
    DEFAULT_CONFLICT_RISK
}

fn default_duration_secs() -> f64 {
    DEFAULT_DURATION_SECS
}

impl Default for KindProfile {
    fn default() -> Self {
        Self {
            resources: Vec::new(),
            priority: DEFAULT_PRIORITY,
            affinity: DEFAULT_AFFINITY,
            conflict_risk: DEFAULT_CONFLICT_RISK,
            duration_secs: DEFAULT_DURATION_SECS,
        }
    }
}

impl KindProfile {
    fn new(
        resources: &[&str],
        priority: PriorityClass,
        affinity: f64,
        conflict_risk: f64,
        duration_secs: f64,
    ) -> Self {
        Self {
            resources: resources.iter().map(|r| r.to_string()).collect(),
            priority,
            affinity,
            conflict_risk,
            duration_secs,
        }
    }
}

/// Per-kind profiles keyed by the kind's canonical name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuristicTables {
    pub version: u32,
    profiles: HashMap<String, KindProfile>,
    fallback: KindProfile,
}

impl Default for HeuristicTables {
    fn default() -> Self {
        use PriorityClass::*;

        let builtin = [
            ("attack", KindProfile::new(&[], High, 0.2, 0.9, 2.0)),
            ("defend", KindProfile::new(&[], High, 0.6, 0.3, 2.0)),
            ("confront", KindProfile::new(&[], Medium, 0.3, 0.7, 1.5)),
            ("avoid", KindProfile::new(&[], Low, 0.1, 0.2, 1.0)),
            ("challenge", KindProfile::new(&[], Medium, 0.3, 0.6, 1.5)),
            ("submit", KindProfile::new(&[], Low, 0.2, 0.1, 0.5)),
            ("compete", KindProfile::new(&[], Medium, 0.2, 0.6, 2.0)),
            ("cooperate", KindProfile::new(&[], Medium, 0.9, 0.1, 2.0)),
            ("investigate", KindProfile::new(&[], Medium, 0.7, 0.1, 3.0)),
            ("search", KindProfile::new(&[], Medium, 0.7, 0.2, 2.0)),
            ("explore", KindProfile::new(&[], Low, 0.6, 0.2, 3.0)),
            ("dialogue", KindProfile::new(&[], Medium, 0.8, 0.1, 1.0)),
            ("communicate", KindProfile::new(&[], Medium, 0.8, 0.1, 1.0)),
            ("negotiate", KindProfile::new(&[], High, 0.7, 0.3, 2.0)),
            ("protect", KindProfile::new(&[], High, 0.7, 0.2, 2.0)),
            ("guard", KindProfile::new(&[], Medium, 0.6, 0.3, 3.0)),
            ("help", KindProfile::new(&[], Medium, 0.9, 0.1, 1.5)),
            (
                "heal",
                KindProfile::new(&["medical_supplies"], High, 0.6, 0.1, 2.0),
            ),
            ("trade", KindProfile::new(&["market_stall"], Low, 0.5, 0.3, 1.5)),
            ("craft", KindProfile::new(&["workbench"], Low, 0.4, 0.2, 3.0)),
            ("move", KindProfile::new(&[], Low, 0.3, 0.2, 1.0)),
            ("observe", KindProfile::new(&[], Trivial, 0.4, 0.05, 1.0)),
            ("rest", KindProfile::new(&[], Trivial, 0.1, 0.0, 2.0)),
            ("wait", KindProfile::new(&[], Trivial, 0.2, 0.0, 0.5)),
        ];

        Self {
            version: HEURISTICS_VERSION,
            profiles: builtin
                .into_iter()
                .map(|(name, profile)| (name.to_string(), profile))
                .collect(),
            fallback: KindProfile::default(),
        }
    }
}

impl HeuristicTables {
    /// Built-in tables with per-kind replacements applied
    pub fn with_overrides(overrides: &HashMap<String, KindProfile>) -> Self {
        let mut tables = Self::default();
        for (name, profile) in overrides {
            let kind = ActionKind::from(name.as_str());
            tables.profiles.insert(kind.as_str().to_string(), profile.clone());
        }
        tables
    }

    pub fn profile(&self, kind: &ActionKind) -> &KindProfile {
        self.profiles.get(kind.as_str()).unwrap_or(&self.fallback)
    }

    pub fn is_known(&self, kind: &ActionKind) -> bool {
        self.profiles.contains_key(kind.as_str())
    }

    pub fn resources_for(&self, kind: &ActionKind) -> &[String] {
        &self.profile(kind).resources
    }

    pub fn priority_for(&self, kind: &ActionKind) -> PriorityClass {
        self.profile(kind).priority
    }

    pub fn affinity_for(&self, kind: &ActionKind) -> f64 {
        self.profile(kind).affinity.clamp(0.0, 1.0)
    }

    pub fn conflict_risk_for(&self, kind: &ActionKind) -> f64 {
        self.profile(kind).conflict_risk.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_uses_defaults() {
        let tables = HeuristicTables::default();
        let kind = ActionKind::from("juggle");

        assert!(!tables.is_known(&kind));
        assert_eq!(tables.priority_for(&kind), PriorityClass::Low);
        assert_eq!(tables.affinity_for(&kind), 0.3);
        assert_eq!(tables.conflict_risk_for(&kind), 0.2);
        assert!(tables.resources_for(&kind).is_empty());
    }

    #[test]
    fn test_builtin_entries() {
        let tables = HeuristicTables::default();
        assert_eq!(tables.version, HEURISTICS_VERSION);
        assert_eq!(
            tables.priority_for(&ActionKind::Attack),
            PriorityClass::High
        );
        assert_eq!(tables.affinity_for(&ActionKind::Investigate), 0.7);
        assert_eq!(tables.resources_for(&ActionKind::Heal), ["medical_supplies"]);
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "Investigate".to_string(),
            KindProfile {
                affinity: 0.95,
                ..KindProfile::default()
            },
        );
        overrides.insert(
            "juggle".to_string(),
            KindProfile {
                priority: PriorityClass::Trivial,
                ..KindProfile::default()
            },
        );
        let tables = HeuristicTables::with_overrides(&overrides);

        assert_eq!(tables.affinity_for(&ActionKind::Investigate), 0.95);
        assert_eq!(
            tables.priority_for(&ActionKind::from("juggle")),
            PriorityClass::Trivial
        );
        // untouched entries keep their built-in values
        assert_eq!(tables.affinity_for(&ActionKind::Dialogue), 0.8);
    }
}
