//! Collaboration types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::GoalGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationKind {
    JointInvestigation,
    SocialAlliance,
    SharedDefense,
    CoordinatedAssault,
    /// Compatible actions without a common goal family
    Cooperative,
    /// Three-way grouping
    Ensemble,
}

impl CollaborationKind {
    pub fn for_goal(goal: Option<GoalGroup>) -> Self {
        match goal {
            Some(GoalGroup::Recon) => CollaborationKind::JointInvestigation,
            Some(GoalGroup::Social) => CollaborationKind::SocialAlliance,
            Some(GoalGroup::Defense) => CollaborationKind::SharedDefense,
            Some(GoalGroup::Aggression) => CollaborationKind::CoordinatedAssault,
            None => CollaborationKind::Cooperative,
        }
    }
}

impl std::fmt::Display for CollaborationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollaborationKind::JointInvestigation => write!(f, "joint_investigation"),
            CollaborationKind::SocialAlliance => write!(f, "social_alliance"),
            CollaborationKind::SharedDefense => write!(f, "shared_defense"),
            CollaborationKind::CoordinatedAssault => write!(f, "coordinated_assault"),
            CollaborationKind::Cooperative => write!(f, "cooperative"),
            CollaborationKind::Ensemble => write!(f, "ensemble"),
        }
    }
}

/// Detected synergy between two or three pending actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationOpportunity {
    pub opportunity_id: Uuid,
    pub participants: Vec<Uuid>,
    pub participant_agents: Vec<String>,
    pub kind: CollaborationKind,
    pub synergy: f64,
    pub estimated_benefit: f64,
    pub identified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStatus {
    Active,
    /// Every participant's action succeeded
    Completed,
    /// At least one participant's action did not succeed
    Disbanded,
}

/// Opportunity promoted after conflict resolution; keyed by opportunity id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaboration {
    pub collaboration_id: Uuid,
    pub participants: Vec<Uuid>,
    pub participant_agents: Vec<String>,
    pub kind: CollaborationKind,
    pub synergy: f64,
    pub estimated_benefit: f64,
    pub status: CollaborationStatus,
    pub formed_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Collaboration {
    pub fn from_opportunity(opportunity: CollaborationOpportunity) -> Self {
        Self {
            collaboration_id: opportunity.opportunity_id,
            participants: opportunity.participants,
            participant_agents: opportunity.participant_agents,
            kind: opportunity.kind,
            synergy: opportunity.synergy,
            estimated_benefit: opportunity.estimated_benefit,
            status: CollaborationStatus::Active,
            formed_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn includes(&self, action_id: &Uuid) -> bool {
        self.participants.contains(action_id)
    }

    pub fn close(&mut self, all_succeeded: bool) {
        if self.status != CollaborationStatus::Active {
            return;
        }
        self.status = if all_succeeded {
            CollaborationStatus::Completed
        } else {
            CollaborationStatus::Disbanded
        };
        self.closed_at = Some(Utc::now());
    }
}
