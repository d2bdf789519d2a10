//! Core action types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Prefix for resource tokens in the allocation map
pub const RESOURCE_TOKEN_PREFIX: &str = "resource:";
/// Prefix for location tokens in the allocation map
pub const LOCATION_TOKEN_PREFIX: &str = "location:";

/// Action type understood by the heuristics.
///
/// Unrecognised types are kept verbatim in `Other` and scored with the
/// table defaults.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    Attack,
    Defend,
    Confront,
    Avoid,
    Challenge,
    Submit,
    Compete,
    Cooperate,
    Investigate,
    Search,
    Explore,
    Dialogue,
    Communicate,
    Negotiate,
    Protect,
    Guard,
    Help,
    Heal,
    Trade,
    Craft,
    Move,
    Observe,
    Rest,
    Wait,
    Other(String),
}

/// Goal families used to spot actions pulling in the same direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalGroup {
    Recon,
    Social,
    Defense,
    Aggression,
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Attack => "attack",
            ActionKind::Defend => "defend",
            ActionKind::Confront => "confront",
            ActionKind::Avoid => "avoid",
            ActionKind::Challenge => "challenge",
            ActionKind::Submit => "submit",
            ActionKind::Compete => "compete",
            ActionKind::Cooperate => "cooperate",
            ActionKind::Investigate => "investigate",
            ActionKind::Search => "search",
            ActionKind::Explore => "explore",
            ActionKind::Dialogue => "dialogue",
            ActionKind::Communicate => "communicate",
            ActionKind::Negotiate => "negotiate",
            ActionKind::Protect => "protect",
            ActionKind::Guard => "guard",
            ActionKind::Help => "help",
            ActionKind::Heal => "heal",
            ActionKind::Trade => "trade",
            ActionKind::Craft => "craft",
            ActionKind::Move => "move",
            ActionKind::Observe => "observe",
            ActionKind::Rest => "rest",
            ActionKind::Wait => "wait",
            ActionKind::Other(raw) => raw.as_str(),
        }
    }

    pub fn goal_group(&self) -> Option<GoalGroup> {
        match self {
            ActionKind::Investigate | ActionKind::Search | ActionKind::Explore => {
                Some(GoalGroup::Recon)
            }
            ActionKind::Dialogue | ActionKind::Communicate | ActionKind::Negotiate => {
                Some(GoalGroup::Social)
            }
            ActionKind::Defend | ActionKind::Protect | ActionKind::Guard => {
                Some(GoalGroup::Defense)
            }
            ActionKind::Attack | ActionKind::Confront | ActionKind::Challenge => {
                Some(GoalGroup::Aggression)
            }
            _ => None,
        }
    }

    /// Whether the two kinds form a recognised opposing pair (order-free)
    pub fn opposes(&self, other: &ActionKind) -> bool {
        use ActionKind::*;
        matches!(
            (self, other),
            (Attack, Defend)
                | (Defend, Attack)
                | (Confront, Avoid)
                | (Avoid, Confront)
                | (Challenge, Submit)
                | (Submit, Challenge)
                | (Compete, Cooperate)
                | (Cooperate, Compete)
        )
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ActionKind {
    fn from(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "attack" | "fight" | "strike" => ActionKind::Attack,
            "defend" => ActionKind::Defend,
            "confront" => ActionKind::Confront,
            "avoid" | "evade" => ActionKind::Avoid,
            "challenge" => ActionKind::Challenge,
            "submit" | "yield" => ActionKind::Submit,
            "compete" => ActionKind::Compete,
            "cooperate" => ActionKind::Cooperate,
            "investigate" => ActionKind::Investigate,
            "search" => ActionKind::Search,
            "explore" => ActionKind::Explore,
            "dialogue" | "talk" | "speak" => ActionKind::Dialogue,
            "communicate" => ActionKind::Communicate,
            "negotiate" => ActionKind::Negotiate,
            "protect" => ActionKind::Protect,
            "guard" => ActionKind::Guard,
            "help" | "assist" => ActionKind::Help,
            "heal" => ActionKind::Heal,
            "trade" => ActionKind::Trade,
            "craft" => ActionKind::Craft,
            "move" | "travel" => ActionKind::Move,
            "observe" | "watch" => ActionKind::Observe,
            "rest" => ActionKind::Rest,
            "wait" => ActionKind::Wait,
            _ => ActionKind::Other(normalized),
        }
    }
}

impl From<String> for ActionKind {
    fn from(raw: String) -> Self {
        ActionKind::from(raw.as_str())
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Priority class. Lower discriminant is more urgent (Critical=0).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    Critical = 0,
    High = 1,
    Medium = 2,
    #[default]
    Low = 3,
    Trivial = 4,
}

impl PriorityClass {
    /// Map an explicit [0, 1] urgency hint onto the five bands
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            PriorityClass::Critical
        } else if score >= 0.7 {
            PriorityClass::High
        } else if score >= 0.5 {
            PriorityClass::Medium
        } else if score >= 0.3 {
            PriorityClass::Low
        } else {
            PriorityClass::Trivial
        }
    }
}

impl std::fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriorityClass::Critical => write!(f, "CRITICAL"),
            PriorityClass::High => write!(f, "HIGH"),
            PriorityClass::Medium => write!(f, "MEDIUM"),
            PriorityClass::Low => write!(f, "LOW"),
            PriorityClass::Trivial => write!(f, "TRIVIAL"),
        }
    }
}

/// Normalised, scored proposal for one agent in one round.
///
/// Built once by the analyzer and shared read-only (behind `Arc`) by
/// conflicts, opportunities and batches.
#[derive(Debug, Clone, Serialize)]
pub struct PendingAction {
    pub action_id: Uuid,
    pub round_id: Uuid,
    pub agent_id: String,
    pub kind: ActionKind,
    pub description: String,
    pub priority: PriorityClass,
    pub resources: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    /// Agent ids this action is aimed at
    pub targets: BTreeSet<String>,
    pub estimated_duration_secs: f64,
    pub collaboration_affinity: f64,
    pub conflict_risk: f64,
    pub created_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn shared_resources(&self, other: &PendingAction) -> usize {
        self.resources.intersection(&other.resources).count()
    }

    pub fn shared_locations(&self, other: &PendingAction) -> usize {
        self.locations.intersection(&other.locations).count()
    }

    pub fn targets_agent(&self, agent_id: &str) -> bool {
        self.targets.contains(agent_id)
    }

    /// True if either action is aimed at the other's owner
    pub fn mutually_engaged(&self, other: &PendingAction) -> bool {
        self.targets_agent(&other.agent_id) || other.targets_agent(&self.agent_id)
    }

    /// Namespaced tokens that must be held exclusively while executing
    pub fn tokens(&self) -> Vec<String> {
        self.resources
            .iter()
            .map(|r| format!("{RESOURCE_TOKEN_PREFIX}{r}"))
            .chain(
                self.locations
                    .iter()
                    .map(|l| format!("{LOCATION_TOKEN_PREFIX}{l}")),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!(ActionKind::from(" Attack "), ActionKind::Attack);
        assert_eq!(ActionKind::from("talk"), ActionKind::Dialogue);
        assert_eq!(
            ActionKind::from("Juggle"),
            ActionKind::Other("juggle".to_string())
        );
        assert_eq!(ActionKind::from("juggle").to_string(), "juggle");
    }

    #[test]
    fn test_opposing_pairs() {
        assert!(ActionKind::Attack.opposes(&ActionKind::Defend));
        assert!(ActionKind::Defend.opposes(&ActionKind::Attack));
        assert!(ActionKind::Cooperate.opposes(&ActionKind::Compete));
        assert!(!ActionKind::Attack.opposes(&ActionKind::Attack));
        assert!(!ActionKind::Attack.opposes(&ActionKind::Avoid));
    }

    #[test]
    fn test_goal_groups() {
        assert_eq!(ActionKind::Search.goal_group(), Some(GoalGroup::Recon));
        assert_eq!(ActionKind::Negotiate.goal_group(), Some(GoalGroup::Social));
        assert_eq!(ActionKind::Guard.goal_group(), Some(GoalGroup::Defense));
        assert_eq!(
            ActionKind::Challenge.goal_group(),
            Some(GoalGroup::Aggression)
        );
        assert_eq!(ActionKind::Rest.goal_group(), None);
    }

    #[test]
    fn test_priority_bands() {
        assert_eq!(PriorityClass::from_score(0.95), PriorityClass::Critical);
        assert_eq!(PriorityClass::from_score(0.9), PriorityClass::Critical);
        assert_eq!(PriorityClass::from_score(0.7), PriorityClass::High);
        assert_eq!(PriorityClass::from_score(0.5), PriorityClass::Medium);
        assert_eq!(PriorityClass::from_score(0.3), PriorityClass::Low);
        assert_eq!(PriorityClass::from_score(0.29), PriorityClass::Trivial);
        assert!(PriorityClass::Critical < PriorityClass::Trivial);
    }
}
