//! Collaboration Identifier - pair and triple synergy scan

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::types::{CollaborationKind, CollaborationOpportunity};
use crate::action::{ActionIndex, PendingAction};
use crate::agent::{NeutralRelationships, RelationshipLookup};

pub const DEFAULT_SYNERGY_THRESHOLD: f64 = 0.6;
pub const DEFAULT_TRIPLE_AFFINITY_THRESHOLD: f64 = 0.6;

pub const SAME_GOAL_SYNERGY: f64 = 0.4;
pub const DISJOINT_RESOURCES_SYNERGY: f64 = 0.3;
pub const SHARED_LOCATION_SYNERGY: f64 = 0.2;
pub const RELATIONSHIP_WEIGHT: f64 = 0.3;

pub const PAIR_BENEFIT_MULTIPLIER: f64 = 1.5;
pub const TRIPLE_BENEFIT: f64 = 2.0;

const SYNERGY_EPSILON: f64 = 1e-9;

pub struct CollaborationIdentifier {
    synergy_threshold: f64,
    triple_affinity_threshold: f64,
    relationships: Arc<dyn RelationshipLookup>,
}

impl CollaborationIdentifier {
    pub fn new(synergy_threshold: f64, triple_affinity_threshold: f64) -> Self {
        Self {
            synergy_threshold,
            triple_affinity_threshold,
            relationships: Arc::new(NeutralRelationships),
        }
    }

    pub fn with_relationships(mut self, relationships: Arc<dyn RelationshipLookup>) -> Self {
        self.relationships = relationships;
        self
    }

    /// Pairs first, then triples. Both scans run independently, so the
    /// same actions may appear in a pair and in a triple.
    pub fn identify(&self, index: &ActionIndex) -> Vec<CollaborationOpportunity> {
        let actions = index.as_slice();
        let n = actions.len();
        let mut opportunities = Vec::new();

        for i in 0..n {
            for j in i + 1..n {
                let members = [actions[i].as_ref(), actions[j].as_ref()];
                let synergy = self.synergy(&members);
                if synergy + SYNERGY_EPSILON < self.synergy_threshold {
                    continue;
                }
                let goal = members[0]
                    .kind
                    .goal_group()
                    .filter(|g| members[1].kind.goal_group() == Some(*g));
                opportunities.push(Self::opportunity(
                    &members,
                    CollaborationKind::for_goal(goal),
                    synergy,
                    synergy * PAIR_BENEFIT_MULTIPLIER,
                ));
            }
        }

        for i in 0..n {
            for j in i + 1..n {
                for k in j + 1..n {
                    let members = [
                        actions[i].as_ref(),
                        actions[j].as_ref(),
                        actions[k].as_ref(),
                    ];
                    if members.iter().any(|a| {
                        a.collaboration_affinity + SYNERGY_EPSILON < self.triple_affinity_threshold
                    }) {
                        continue;
                    }
                    let synergy = self.synergy(&members);
                    if synergy + SYNERGY_EPSILON < self.synergy_threshold {
                        continue;
                    }
                    opportunities.push(Self::opportunity(
                        &members,
                        CollaborationKind::Ensemble,
                        synergy,
                        TRIPLE_BENEFIT,
                    ));
                }
            }
        }

        debug!(
            "Identified {} collaboration opportunities among {} actions",
            opportunities.len(),
            n
        );
        opportunities
    }

    /// Sum of the factors that apply, clamped to [0, 1]:
    /// common goal family, pairwise-disjoint resources, a location shared by
    /// all members, and the mean pairwise relationship bonus.
    pub fn synergy(&self, members: &[&PendingAction]) -> f64 {
        if members.len() < 2 {
            return 0.0;
        }
        let mut score = 0.0;

        let first_goal = members[0].kind.goal_group();
        if first_goal.is_some() && members.iter().all(|a| a.kind.goal_group() == first_goal) {
            score += SAME_GOAL_SYNERGY;
        }

        let mut disjoint = true;
        let mut bonus_sum = 0.0;
        let mut pairs = 0usize;
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                if a.shared_resources(b) > 0 {
                    disjoint = false;
                }
                bonus_sum += self
                    .relationships
                    .relationship_bonus(&a.agent_id, &b.agent_id)
                    .clamp(-1.0, 1.0);
                pairs += 1;
            }
        }
        if disjoint {
            score += DISJOINT_RESOURCES_SYNERGY;
        }

        let shares_location = members[0]
            .locations
            .iter()
            .any(|loc| members[1..].iter().all(|a| a.locations.contains(loc)));
        if shares_location {
            score += SHARED_LOCATION_SYNERGY;
        }

        let bonus = bonus_sum / pairs as f64;
        if bonus != 0.0 {
            score += RELATIONSHIP_WEIGHT * bonus;
        }

        score.clamp(0.0, 1.0)
    }

    fn opportunity(
        members: &[&PendingAction],
        kind: CollaborationKind,
        synergy: f64,
        estimated_benefit: f64,
    ) -> CollaborationOpportunity {
        CollaborationOpportunity {
            opportunity_id: Uuid::new_v4(),
            participants: members.iter().map(|a| a.action_id).collect(),
            participant_agents: members.iter().map(|a| a.agent_id.clone()).collect(),
            kind,
            synergy,
            estimated_benefit,
            identified_at: Utc::now(),
        }
    }
}

impl Default for CollaborationIdentifier {
    fn default() -> Self {
        Self::new(DEFAULT_SYNERGY_THRESHOLD, DEFAULT_TRIPLE_AFFINITY_THRESHOLD)
    }
}
