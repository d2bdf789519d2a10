//! Traits for the collaborators the coordinator consumes

use async_trait::async_trait;
use std::collections::HashMap;

use super::types::{ActionOutcome, ActionProposal, DecisionContext};
use crate::action::PendingAction;
use crate::error::Result;

/// Autonomous participant in a coordination round.
///
/// Implementations may block, fail or hang; the coordinator bounds every
/// call with its own timeout and isolates failures to the calling agent.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique id within a round
    fn id(&self) -> &str;

    /// Propose at most one action for this round.
    ///
    /// `Ok(None)` means the agent abstains. Must be callable repeatedly.
    async fn propose_action(&self, ctx: &DecisionContext) -> Result<Option<ActionProposal>>;

    /// Carry out an action that survived conflict resolution.
    ///
    /// The default completes immediately.
    async fn execute_action(&self, action: &PendingAction) -> Result<ActionOutcome> {
        Ok(ActionOutcome::completed(format!(
            "{} completed {}",
            self.id(),
            action.kind
        )))
    }
}

/// Relationship strength between two agents, in [-1, 1]
pub trait RelationshipLookup: Send + Sync {
    fn relationship_bonus(&self, agent_a: &str, agent_b: &str) -> f64;
}

/// Treats every pair of agents as strangers
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralRelationships;

impl RelationshipLookup for NeutralRelationships {
    fn relationship_bonus(&self, _agent_a: &str, _agent_b: &str) -> f64 {
        0.0
    }
}

/// Symmetric in-memory relationship table
#[derive(Debug, Clone, Default)]
pub struct StaticRelationships {
    bonuses: HashMap<(String, String), f64>,
}

impl StaticRelationships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, agent_a: &str, agent_b: &str, bonus: f64) -> Self {
        self.set(agent_a, agent_b, bonus);
        self
    }

    pub fn set(&mut self, agent_a: &str, agent_b: &str, bonus: f64) {
        self.bonuses
            .insert(Self::key(agent_a, agent_b), bonus.clamp(-1.0, 1.0));
    }

    fn key(agent_a: &str, agent_b: &str) -> (String, String) {
        if agent_a <= agent_b {
            (agent_a.to_string(), agent_b.to_string())
        } else {
            (agent_b.to_string(), agent_a.to_string())
        }
    }
}

impl RelationshipLookup for StaticRelationships {
    fn relationship_bonus(&self, agent_a: &str, agent_b: &str) -> f64 {
        self.bonuses
            .get(&Self::key(agent_a, agent_b))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Story-level consistency check between two pending actions.
///
/// Extension point: the built-in implementation never reports an
/// inconsistency.
pub trait NarrativeConsistency: Send + Sync {
    fn is_inconsistent(&self, a: &PendingAction, b: &PendingAction) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoNarrativeCheck;

impl NarrativeConsistency for NoNarrativeCheck {
    fn is_inconsistent(&self, _a: &PendingAction, _b: &PendingAction) -> bool {
        false
    }
}
