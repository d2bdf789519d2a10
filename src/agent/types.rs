//! Data exchanged with agents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context handed to an agent when its decision is requested.
///
/// Only the identities of the other participants are shared, never their
/// proposals.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionContext {
    pub round_id: Uuid,
    pub round_number: u64,
    /// The agent being asked
    pub agent_id: String,
    /// Other agents taking part in this round
    pub co_participants: Vec<String>,
    /// Caller-supplied world state for the round
    pub shared: serde_json::Value,
    pub issued_at: DateTime<Utc>,
}

/// Raw proposal returned by an agent.
///
/// Agents typically produce these from loosely structured output, so every
/// field except the action type is optional and unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionProposal {
    pub action_type: String,
    pub description: String,
    /// Explicit urgency hint in [0, 1]
    pub priority: Option<f64>,
    pub resources: Vec<String>,
    pub location: Option<String>,
    pub target_location: Option<String>,
    pub locations: Vec<String>,
    pub target: Option<String>,
    pub targets: Vec<String>,
    pub duration_secs: Option<f64>,
}

impl ActionProposal {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resources.push(resource.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.locations.push(location.into());
        self
    }

    pub fn with_target(mut self, agent_id: impl Into<String>) -> Self {
        self.targets.push(agent_id.into());
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }
}

/// What an agent reports after carrying out its action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub summary: String,
}

impl ActionOutcome {
    pub fn completed(summary: impl Into<String>) -> Self {
        Self {
            success: true,
            summary: summary.into(),
        }
    }

    pub fn failed(summary: impl Into<String>) -> Self {
        Self {
            success: false,
            summary: summary.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_from_loose_json() {
        let raw = r#"{
            "action_type": "investigate",
            "location": "library",
            "target": "mara",
            "priority": 0.75,
            "mood": "curious"
        }"#;
        let proposal: ActionProposal = serde_json::from_str(raw).unwrap();

        assert_eq!(proposal.action_type, "investigate");
        assert_eq!(proposal.location.as_deref(), Some("library"));
        assert_eq!(proposal.target.as_deref(), Some("mara"));
        assert_eq!(proposal.priority, Some(0.75));
        assert!(proposal.resources.is_empty());
    }
}
