//! Collaboration Former - promotes surviving opportunities

use tracing::debug;

use super::types::{Collaboration, CollaborationOpportunity};
use crate::action::ActionIndex;
use crate::conflict::ResolutionPlan;

#[derive(Debug, Default)]
pub struct CollaborationFormer;

impl CollaborationFormer {
    pub fn new() -> Self {
        Self
    }

    /// Opportunities with at least two participants still pending become
    /// active collaborations of those survivors; the rest are dropped.
    pub fn form(
        &self,
        opportunities: Vec<CollaborationOpportunity>,
        index: &ActionIndex,
        plan: &ResolutionPlan,
    ) -> Vec<Collaboration> {
        opportunities
            .into_iter()
            .filter_map(|mut opportunity| {
                let before = opportunity.participants.len();
                let (participants, agents): (Vec<_>, Vec<_>) = opportunity
                    .participants
                    .iter()
                    .copied()
                    .zip(opportunity.participant_agents.iter().cloned())
                    .filter(|(id, _)| plan.is_pending(index, id))
                    .unzip();

                if participants.len() < 2 {
                    debug!(
                        "Dropping opportunity {} ({}): {} of {} participants pending",
                        opportunity.opportunity_id,
                        opportunity.kind,
                        participants.len(),
                        before
                    );
                    return None;
                }
                if participants.len() < before {
                    debug!(
                        "Forming opportunity {} ({}) from {} of {} participants",
                        opportunity.opportunity_id,
                        opportunity.kind,
                        participants.len(),
                        before
                    );
                }

                opportunity.participants = participants;
                opportunity.participant_agents = agents;
                Some(Collaboration::from_opportunity(opportunity))
            })
            .collect()
    }
}
