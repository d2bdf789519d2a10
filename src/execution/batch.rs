//! Batch planning
//!
//! Actions forced into a strict order by a sequential resolution run as
//! single-action batches, in that order; everything else pending shares
//! one final concurrent batch.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::action::{ActionIndex, PendingAction};
use crate::conflict::ResolutionPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    Sequential,
    Concurrent,
}

#[derive(Debug, Clone)]
pub struct Batch {
    pub index: usize,
    pub mode: BatchMode,
    pub actions: Vec<Arc<PendingAction>>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct BatchPlanner;

impl BatchPlanner {
    pub fn plan(index: &ActionIndex, plan: &ResolutionPlan) -> Vec<Batch> {
        let mut batches = Vec::new();
        let mut scheduled: HashSet<uuid::Uuid> = HashSet::new();

        for action_id in plan.sequence() {
            let Some(action) = index.get(&action_id) else {
                continue;
            };
            if !scheduled.insert(action_id) {
                continue;
            }
            batches.push(Batch {
                index: batches.len(),
                mode: BatchMode::Sequential,
                actions: vec![Arc::clone(action)],
            });
        }

        let rest: Vec<Arc<PendingAction>> = index
            .iter()
            .filter(|a| !plan.is_deferred(&a.action_id) && !scheduled.contains(&a.action_id))
            .cloned()
            .collect();
        if !rest.is_empty() {
            batches.push(Batch {
                index: batches.len(),
                mode: BatchMode::Concurrent,
                actions: rest,
            });
        }

        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionAnalyzer;
    use crate::agent::ActionProposal;
    use crate::conflict::ResolutionOutcome;
    use uuid::Uuid;

    fn index_of(agents: &[&str]) -> ActionIndex {
        let proposals: Vec<_> = agents
            .iter()
            .map(|a| (a.to_string(), ActionProposal::new("rest")))
            .collect();
        ActionAnalyzer::default()
            .analyze_round(Uuid::new_v4(), &proposals)
            .unwrap()
    }

    #[test]
    fn test_single_concurrent_batch_by_default() {
        let index = index_of(&["ava", "bram", "cole"]);
        let batches = BatchPlanner::plan(&index, &ResolutionPlan::new());

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].mode, BatchMode::Concurrent);
        assert_eq!(batches[0].len(), 3);
    }

    #[test]
    fn test_sequence_then_rest_and_deferred_skipped() {
        let index = index_of(&["ava", "bram", "cole", "dana"]);
        let id = |agent: &str| index.for_agent(agent).unwrap().action_id;

        let mut plan = ResolutionPlan::new();
        plan.apply(&ResolutionOutcome::Ordered {
            order: vec![id("cole"), id("ava")],
        });
        plan.apply(&ResolutionOutcome::Winner {
            winner: id("bram"),
            deferred: vec![id("dana")],
        });

        let batches = BatchPlanner::plan(&index, &plan);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].mode, BatchMode::Sequential);
        assert_eq!(batches[0].actions[0].agent_id, "cole");
        assert_eq!(batches[1].actions[0].agent_id, "ava");
        assert_eq!(batches[2].mode, BatchMode::Concurrent);
        assert_eq!(
            batches[2]
                .actions
                .iter()
                .map(|a| a.agent_id.as_str())
                .collect::<Vec<_>>(),
            vec!["bram"]
        );
        assert_eq!(batches.iter().map(|b| b.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_round_has_no_batches() {
        let index = ActionIndex::new();
        assert!(BatchPlanner::plan(&index, &ResolutionPlan::new()).is_empty());
    }
}
