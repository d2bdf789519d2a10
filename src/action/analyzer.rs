//! Action Analyzer - turns raw proposals into scored pending actions

use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::heuristics::HeuristicTables;
use super::types::{ActionKind, PendingAction, PriorityClass};
use crate::agent::ActionProposal;
use crate::error::{CoordError, Result};

/// The round's pending actions, in collection order.
///
/// Holds at most one action per agent.
#[derive(Debug, Clone, Default)]
pub struct ActionIndex {
    actions: Vec<Arc<PendingAction>>,
    by_id: HashMap<Uuid, usize>,
    by_agent: HashMap<String, usize>,
}

impl ActionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, action: PendingAction) -> Result<Arc<PendingAction>> {
        if self.by_agent.contains_key(&action.agent_id) {
            return Err(CoordError::DuplicateAgent(action.agent_id));
        }
        let position = self.actions.len();
        let action = Arc::new(action);
        self.by_id.insert(action.action_id, position);
        self.by_agent.insert(action.agent_id.clone(), position);
        self.actions.push(Arc::clone(&action));
        Ok(action)
    }

    pub fn get(&self, action_id: &Uuid) -> Option<&Arc<PendingAction>> {
        self.by_id.get(action_id).map(|&i| &self.actions[i])
    }

    pub fn for_agent(&self, agent_id: &str) -> Option<&Arc<PendingAction>> {
        self.by_agent.get(agent_id).map(|&i| &self.actions[i])
    }

    /// Collection-order position, used as the stable tie-break everywhere
    pub fn position(&self, action_id: &Uuid) -> Option<usize> {
        self.by_id.get(action_id).copied()
    }

    pub fn contains(&self, action_id: &Uuid) -> bool {
        self.by_id.contains_key(action_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PendingAction>> {
        self.actions.iter()
    }

    pub fn as_slice(&self) -> &[Arc<PendingAction>] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

pub struct ActionAnalyzer {
    tables: HeuristicTables,
}

impl ActionAnalyzer {
    pub fn new(tables: HeuristicTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &HeuristicTables {
        &self.tables
    }

    /// Score one proposal
    pub fn analyze(
        &self,
        round_id: Uuid,
        agent_id: &str,
        proposal: &ActionProposal,
    ) -> PendingAction {
        let kind = ActionKind::from(proposal.action_type.as_str());
        let profile = self.tables.profile(&kind);

        let resources: BTreeSet<String> = profile
            .resources
            .iter()
            .chain(proposal.resources.iter())
            .filter_map(|r| normalize_token(r))
            .collect();

        let locations: BTreeSet<String> = proposal
            .location
            .iter()
            .chain(proposal.target_location.iter())
            .chain(proposal.locations.iter())
            .filter_map(|l| normalize_token(l))
            .collect();

        let targets: BTreeSet<String> = proposal
            .target
            .iter()
            .chain(proposal.targets.iter())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && t != agent_id)
            .collect();

        let priority = match proposal.priority.filter(|p| p.is_finite()) {
            Some(score) => PriorityClass::from_score(score),
            None => profile.priority,
        };

        let estimated_duration_secs = proposal
            .duration_secs
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(profile.duration_secs);

        let description = if proposal.description.trim().is_empty() {
            kind.to_string()
        } else {
            proposal.description.trim().to_string()
        };

        PendingAction {
            action_id: Uuid::new_v4(),
            round_id,
            agent_id: agent_id.to_string(),
            collaboration_affinity: self.tables.affinity_for(&kind),
            conflict_risk: self.tables.conflict_risk_for(&kind),
            kind,
            description,
            priority,
            resources,
            locations,
            targets,
            estimated_duration_secs,
            created_at: Utc::now(),
        }
    }

    /// Score every proposal of a round and register it in a fresh index
    pub fn analyze_round(
        &self,
        round_id: Uuid,
        proposals: &[(String, ActionProposal)],
    ) -> Result<ActionIndex> {
        let mut index = ActionIndex::new();
        for (agent_id, proposal) in proposals {
            let action = index.insert(self.analyze(round_id, agent_id, proposal))?;
            debug!(
                "Analyzed {} from {}: priority={} resources={:?} locations={:?} targets={:?}",
                action.kind,
                action.agent_id,
                action.priority,
                action.resources,
                action.locations,
                action.targets
            );
        }
        Ok(index)
    }
}

impl Default for ActionAnalyzer {
    fn default() -> Self {
        Self::new(HeuristicTables::default())
    }
}

fn normalize_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
