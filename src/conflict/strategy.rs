//! Resolution strategies, one handler per `StrategyKind`

use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::types::{Conflict, ResolutionOutcome, StrategyKind};
use crate::action::PendingAction;
use crate::error::StrategyError;

/// Handler for one strategy.
///
/// `actions` are the conflict's still-pending participants in collection
/// order. Returning `Err` makes the resolver try the next candidate.
pub trait ResolutionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn resolve(
        &self,
        conflict: &Conflict,
        actions: &[Arc<PendingAction>],
    ) -> Result<ResolutionOutcome, StrategyError>;
}

fn require_participants(actions: &[Arc<PendingAction>]) -> Result<(), StrategyError> {
    if actions.len() < 2 {
        return Err(StrategyError::NotEnoughParticipants {
            found: actions.len(),
        });
    }
    Ok(())
}

/// Most urgent first; ties keep collection order
pub fn rank_by_priority(actions: &[Arc<PendingAction>]) -> Vec<Arc<PendingAction>> {
    let mut ranked = actions.to_vec();
    ranked.sort_by_key(|a| a.priority);
    ranked
}

fn agent_list(actions: &[Arc<PendingAction>]) -> String {
    actions
        .iter()
        .map(|a| a.agent_id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Highest priority class proceeds; everyone else is deferred
#[derive(Debug, Default)]
pub struct PriorityBasedStrategy;

impl ResolutionStrategy for PriorityBasedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PriorityBased
    }

    fn resolve(
        &self,
        _conflict: &Conflict,
        actions: &[Arc<PendingAction>],
    ) -> Result<ResolutionOutcome, StrategyError> {
        require_participants(actions)?;
        let ranked = rank_by_priority(actions);
        Ok(ResolutionOutcome::Winner {
            winner: ranked[0].action_id,
            deferred: ranked[1..].iter().map(|a| a.action_id).collect(),
        })
    }
}

/// Everyone proceeds, strictly one after another, most urgent first
#[derive(Debug, Default)]
pub struct SequentialStrategy;

impl ResolutionStrategy for SequentialStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Sequential
    }

    fn resolve(
        &self,
        _conflict: &Conflict,
        actions: &[Arc<PendingAction>],
    ) -> Result<ResolutionOutcome, StrategyError> {
        require_participants(actions)?;
        Ok(ResolutionOutcome::Ordered {
            order: rank_by_priority(actions)
                .iter()
                .map(|a| a.action_id)
                .collect(),
        })
    }
}

#[derive(Debug, Default)]
pub struct NegotiationStrategy;

impl ResolutionStrategy for NegotiationStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Negotiation
    }

    fn resolve(
        &self,
        conflict: &Conflict,
        actions: &[Arc<PendingAction>],
    ) -> Result<ResolutionOutcome, StrategyError> {
        require_participants(actions)?;
        Ok(ResolutionOutcome::Agreement {
            summary: format!(
                "{} negotiated terms over the {} and all proceed",
                agent_list(actions),
                conflict.kind
            ),
        })
    }
}

#[derive(Debug, Default)]
pub struct CompromiseStrategy;

impl ResolutionStrategy for CompromiseStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Compromise
    }

    fn resolve(
        &self,
        conflict: &Conflict,
        actions: &[Arc<PendingAction>],
    ) -> Result<ResolutionOutcome, StrategyError> {
        require_participants(actions)?;
        Ok(ResolutionOutcome::Agreement {
            summary: format!(
                "{} each conceded ground on the {}",
                agent_list(actions),
                conflict.kind
            ),
        })
    }
}

#[derive(Debug, Default)]
pub struct CollaborationStrategy;

impl ResolutionStrategy for CollaborationStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Collaboration
    }

    fn resolve(
        &self,
        _conflict: &Conflict,
        actions: &[Arc<PendingAction>],
    ) -> Result<ResolutionOutcome, StrategyError> {
        require_participants(actions)?;
        Ok(ResolutionOutcome::Agreement {
            summary: format!("{} turned the clash into a joint effort", agent_list(actions)),
        })
    }
}

/// Equal-weight vote.
///
/// Each participant backs the most urgent action other than its own;
/// plurality wins and ties are broken at random.
#[derive(Debug, Default)]
pub struct DemocraticStrategy;

impl ResolutionStrategy for DemocraticStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Democratic
    }

    fn resolve(
        &self,
        _conflict: &Conflict,
        actions: &[Arc<PendingAction>],
    ) -> Result<ResolutionOutcome, StrategyError> {
        require_participants(actions)?;
        let ranked = rank_by_priority(actions);

        let mut votes: HashMap<Uuid, usize> = HashMap::new();
        for voter in actions {
            if let Some(choice) = ranked.iter().find(|a| a.action_id != voter.action_id) {
                *votes.entry(choice.action_id).or_insert(0) += 1;
            }
        }

        let tally: Vec<(Uuid, usize)> = actions
            .iter()
            .map(|a| (a.action_id, votes.get(&a.action_id).copied().unwrap_or(0)))
            .collect();
        let top = tally.iter().map(|(_, n)| *n).max().unwrap_or(0);
        let leaders: Vec<Uuid> = tally
            .iter()
            .filter(|(_, n)| *n == top)
            .map(|(id, _)| *id)
            .collect();

        let winner = *leaders
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| StrategyError::Declined("no votes cast".into()))?;

        Ok(ResolutionOutcome::Vote {
            winner,
            tie_broken: leaders.len() > 1,
            tally,
        })
    }
}

/// Universal fallback: pick any participant
#[derive(Debug, Default)]
pub struct RandomStrategy;

impl ResolutionStrategy for RandomStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Random
    }

    fn resolve(
        &self,
        _conflict: &Conflict,
        actions: &[Arc<PendingAction>],
    ) -> Result<ResolutionOutcome, StrategyError> {
        require_participants(actions)?;
        let chosen = actions
            .choose(&mut rand::thread_rng())
            .ok_or(StrategyError::NotEnoughParticipants { found: 0 })?;
        Ok(ResolutionOutcome::Chosen {
            winner: chosen.action_id,
        })
    }
}

/// One handler per strategy variant
pub fn builtin_strategies() -> Vec<Box<dyn ResolutionStrategy>> {
    vec![
        Box::new(PriorityBasedStrategy),
        Box::new(SequentialStrategy),
        Box::new(NegotiationStrategy),
        Box::new(CompromiseStrategy),
        Box::new(CollaborationStrategy),
        Box::new(DemocraticStrategy),
        Box::new(RandomStrategy),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionAnalyzer, ActionIndex};
    use crate::agent::ActionProposal;
    use crate::conflict::ConflictKind;

    fn setup(priorities: &[(&str, f64)]) -> (Conflict, ActionIndex) {
        let proposals: Vec<_> = priorities
            .iter()
            .map(|(agent, p)| {
                (
                    agent.to_string(),
                    ActionProposal::new("gather")
                        .with_resource("R1")
                        .with_priority(*p),
                )
            })
            .collect();
        let index = ActionAnalyzer::default()
            .analyze_round(Uuid::new_v4(), &proposals)
            .unwrap();
        let conflict = Conflict::new(
            ConflictKind::ResourceContention,
            0.3,
            index.iter().map(|a| a.action_id).collect(),
            index.iter().map(|a| a.agent_id.clone()).collect(),
        );
        (conflict, index)
    }

    #[test]
    fn test_priority_based_defers_losers() {
        let (conflict, index) = setup(&[("ava", 0.4), ("bram", 0.95), ("cole", 0.6)]);
        let outcome = PriorityBasedStrategy
            .resolve(&conflict, index.as_slice())
            .unwrap();

        let bram = index.for_agent("bram").unwrap().action_id;
        let ava = index.for_agent("ava").unwrap().action_id;
        let cole = index.for_agent("cole").unwrap().action_id;
        assert_eq!(
            outcome,
            ResolutionOutcome::Winner {
                winner: bram,
                deferred: vec![cole, ava],
            }
        );
    }

    #[test]
    fn test_priority_tie_keeps_collection_order() {
        let (conflict, index) = setup(&[("ava", 0.5), ("bram", 0.5)]);
        let outcome = PriorityBasedStrategy
            .resolve(&conflict, index.as_slice())
            .unwrap();
        assert_eq!(
            outcome.winner(),
            Some(index.for_agent("ava").unwrap().action_id)
        );
    }

    #[test]
    fn test_sequential_orders_everyone() {
        let (conflict, index) = setup(&[("ava", 0.1), ("bram", 0.8)]);
        let outcome = SequentialStrategy
            .resolve(&conflict, index.as_slice())
            .unwrap();
        assert_eq!(
            outcome,
            ResolutionOutcome::Ordered {
                order: vec![
                    index.for_agent("bram").unwrap().action_id,
                    index.for_agent("ava").unwrap().action_id,
                ]
            }
        );
    }

    #[test]
    fn test_qualitative_strategies_keep_everyone() {
        let (conflict, index) = setup(&[("ava", 0.1), ("bram", 0.8)]);
        for strategy in [
            Box::new(NegotiationStrategy) as Box<dyn ResolutionStrategy>,
            Box::new(CompromiseStrategy),
            Box::new(CollaborationStrategy),
        ] {
            let outcome = strategy.resolve(&conflict, index.as_slice()).unwrap();
            match outcome {
                ResolutionOutcome::Agreement { summary } => {
                    assert!(summary.contains("ava"));
                    assert!(summary.contains("bram"));
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }
    }

    #[test]
    fn test_democratic_majority() {
        // ava and cole both back bram (most urgent); bram backs cole
        let (conflict, index) = setup(&[("ava", 0.1), ("bram", 0.95), ("cole", 0.6)]);
        let outcome = DemocraticStrategy
            .resolve(&conflict, index.as_slice())
            .unwrap();
        match outcome {
            ResolutionOutcome::Vote {
                winner,
                tally,
                tie_broken,
            } => {
                assert_eq!(winner, index.for_agent("bram").unwrap().action_id);
                assert!(!tie_broken);
                assert_eq!(tally.iter().map(|(_, n)| n).sum::<usize>(), 3);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_democratic_two_way_tie_is_broken() {
        let (conflict, index) = setup(&[("ava", 0.1), ("bram", 0.95)]);
        let outcome = DemocraticStrategy
            .resolve(&conflict, index.as_slice())
            .unwrap();
        match outcome {
            ResolutionOutcome::Vote {
                winner, tie_broken, ..
            } => {
                assert!(tie_broken);
                assert!(index.contains(&winner));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_random_picks_a_participant() {
        let (conflict, index) = setup(&[("ava", 0.1), ("bram", 0.95)]);
        let winner = RandomStrategy
            .resolve(&conflict, index.as_slice())
            .unwrap()
            .winner()
            .unwrap();
        assert!(index.contains(&winner));
    }

    #[test]
    fn test_single_participant_is_rejected() {
        let (conflict, index) = setup(&[("ava", 0.1), ("bram", 0.95)]);
        let only = &index.as_slice()[..1];
        for strategy in builtin_strategies() {
            assert_eq!(
                strategy.resolve(&conflict, only),
                Err(StrategyError::NotEnoughParticipants { found: 1 })
            );
        }
    }
}
