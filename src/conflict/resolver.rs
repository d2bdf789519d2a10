//! Conflict Resolver - strategy dispatch over explicit candidate tables

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::strategy::{builtin_strategies, ResolutionStrategy};
use super::types::{Conflict, ConflictKind, ConflictState, ResolutionOutcome, StrategyKind};
use crate::action::{ActionIndex, PendingAction};
use crate::error::Result;

/// Ordered candidate strategies per conflict kind
pub fn default_candidates(kind: ConflictKind) -> &'static [StrategyKind] {
    use StrategyKind::*;
    match kind {
        ConflictKind::ResourceContention => &[PriorityBased, Negotiation, Sequential],
        ConflictKind::Location => &[PriorityBased, Sequential, Compromise],
        ConflictKind::DirectConfrontation => &[Negotiation, PriorityBased, Democratic],
        ConflictKind::NarrativeInconsistency => &[Compromise, Sequential, PriorityBased],
        ConflictKind::Temporal => &[Sequential, PriorityBased],
        ConflictKind::Social => &[Negotiation, Democratic, Compromise],
    }
}

/// Combined effect of every resolution in a round on the action set
#[derive(Debug, Clone, Default)]
pub struct ResolutionPlan {
    deferred: HashSet<Uuid>,
    /// Forced execution orders, one per sequential resolution
    orders: Vec<Vec<Uuid>>,
}

impl ResolutionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_deferred(&self, action_id: &Uuid) -> bool {
        self.deferred.contains(action_id)
    }

    /// Present in the round and not suppressed by a resolution
    pub fn is_pending(&self, index: &ActionIndex, action_id: &Uuid) -> bool {
        index.contains(action_id) && !self.is_deferred(action_id)
    }

    pub fn deferred(&self) -> &HashSet<Uuid> {
        &self.deferred
    }

    /// Pending actions that must run one at a time, in order.
    ///
    /// Every recorded order is respected: an action runs after everything
    /// any resolution placed before it. Among actions free to go next, the
    /// one seen first wins. Contradictory orders from custom handlers are
    /// broken at the earliest-seen action.
    pub fn sequence(&self) -> Vec<Uuid> {
        let mut seen: Vec<Uuid> = Vec::new();
        let mut before: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        for order in &self.orders {
            for id in order {
                if !seen.contains(id) {
                    seen.push(*id);
                }
            }
            for pair in order.windows(2) {
                if pair[0] != pair[1] {
                    before.entry(pair[1]).or_default().insert(pair[0]);
                }
            }
        }

        let mut placed: HashSet<Uuid> = HashSet::new();
        let mut merged = Vec::with_capacity(seen.len());
        while merged.len() < seen.len() {
            let ready = seen.iter().find(|id| {
                !placed.contains(*id)
                    && before
                        .get(*id)
                        .map_or(true, |preds| preds.iter().all(|p| placed.contains(p)))
            });
            let next = match ready {
                Some(id) => *id,
                None => {
                    let Some(id) = seen.iter().find(|id| !placed.contains(*id)) else {
                        break;
                    };
                    warn!("Contradictory sequential orders, breaking cycle at {}", id);
                    *id
                }
            };
            placed.insert(next);
            merged.push(next);
        }

        merged
            .into_iter()
            .filter(|id| !self.deferred.contains(id))
            .collect()
    }

    pub fn apply(&mut self, outcome: &ResolutionOutcome) {
        match outcome {
            ResolutionOutcome::Winner { deferred, .. } => {
                self.deferred.extend(deferred.iter().copied());
            }
            ResolutionOutcome::Ordered { order } if !order.is_empty() => {
                self.orders.push(order.clone());
            }
            _ => {}
        }
    }
}

pub struct ConflictResolver {
    handlers: HashMap<StrategyKind, Box<dyn ResolutionStrategy>>,
    candidates: HashMap<ConflictKind, Vec<StrategyKind>>,
}

impl ConflictResolver {
    pub fn new() -> Self {
        let mut resolver = Self {
            handlers: HashMap::new(),
            candidates: ConflictKind::ALL
                .iter()
                .map(|kind| (*kind, default_candidates(*kind).to_vec()))
                .collect(),
        };
        for handler in builtin_strategies() {
            resolver.register(handler);
        }
        resolver
    }

    /// Built-in handlers with per-kind candidate lists replaced
    pub fn with_overrides(overrides: &HashMap<ConflictKind, Vec<StrategyKind>>) -> Self {
        let mut resolver = Self::new();
        for (kind, candidates) in overrides {
            resolver.candidates.insert(*kind, candidates.clone());
        }
        resolver
    }

    /// Install or replace the handler for its strategy kind
    pub fn register(&mut self, handler: Box<dyn ResolutionStrategy>) {
        self.handlers.insert(handler.kind(), handler);
    }

    /// Candidates to try, in order. Random when nothing is configured.
    pub fn candidates(&self, kind: ConflictKind) -> Vec<StrategyKind> {
        match self.candidates.get(&kind) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => vec![StrategyKind::Random],
        }
    }

    /// Drive one conflict to a terminal state and fold the result into `plan`.
    ///
    /// Errors only on an invalid state transition.
    pub fn resolve(
        &self,
        conflict: &mut Conflict,
        index: &ActionIndex,
        plan: &mut ResolutionPlan,
    ) -> Result<()> {
        let participants: Vec<Arc<PendingAction>> = conflict
            .involved
            .iter()
            .filter(|id| plan.is_pending(index, id))
            .filter_map(|id| index.get(id).cloned())
            .collect();

        if participants.len() < 2 {
            debug!(
                "Conflict {} superseded: {} of {} participants still pending",
                conflict.conflict_id,
                participants.len(),
                conflict.involved.len()
            );
            return conflict.resolve(ResolutionOutcome::Superseded {
                remaining: participants.iter().map(|a| a.action_id).collect(),
            });
        }

        for strategy in self.candidates(conflict.kind) {
            conflict.select_strategy(strategy)?;

            let Some(handler) = self.handlers.get(&strategy) else {
                conflict.record_failure("no handler registered");
                warn!(
                    "No handler registered for {} (conflict {})",
                    strategy, conflict.conflict_id
                );
                continue;
            };

            match handler.resolve(conflict, &participants) {
                Ok(outcome) => {
                    plan.apply(&outcome);
                    info!(
                        "Resolved {} conflict {} between {} via {}",
                        conflict.kind,
                        conflict.conflict_id,
                        conflict.involved_agents.join(", "),
                        strategy
                    );
                    return conflict.resolve(outcome);
                }
                Err(e) => {
                    debug!(
                        "Strategy {} failed for conflict {}: {}",
                        strategy, conflict.conflict_id, e
                    );
                    conflict.record_failure(e.to_string());
                }
            }
        }

        warn!(
            "Conflict {} ({}) left unresolved after {} attempts",
            conflict.conflict_id,
            conflict.kind,
            conflict.attempts.len()
        );
        conflict.mark_unresolved()
    }

    /// Resolve a round's conflicts, most severe first.
    ///
    /// Sorts `conflicts` into resolution order (ties keep detection order).
    /// A conflict whose transition fails is forced to Unresolved and the
    /// rest still resolve.
    pub fn resolve_all(&self, conflicts: &mut [Conflict], index: &ActionIndex) -> ResolutionPlan {
        let mut plan = ResolutionPlan::new();
        conflicts.sort_by(|a, b| b.severity.total_cmp(&a.severity));
        for conflict in conflicts.iter_mut() {
            if conflict.state != ConflictState::Detected {
                continue;
            }
            if let Err(e) = self.resolve(conflict, index, &mut plan) {
                error!("Resolution of conflict {} aborted: {}", conflict.conflict_id, e);
                if !conflict.state.is_terminal() {
                    if let Err(e) = conflict.mark_unresolved() {
                        error!(
                            "Conflict {} stuck in {}: {}",
                            conflict.conflict_id, conflict.state, e
                        );
                    }
                }
            }
        }
        plan
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionAnalyzer;
    use crate::agent::ActionProposal;
    use crate::conflict::ConflictDetector;
    use crate::error::StrategyError;

    struct Refuses(StrategyKind);

    impl ResolutionStrategy for Refuses {
        fn kind(&self) -> StrategyKind {
            self.0
        }

        fn resolve(
            &self,
            _conflict: &Conflict,
            _actions: &[Arc<PendingAction>],
        ) -> std::result::Result<ResolutionOutcome, StrategyError> {
            Err(StrategyError::Declined("refused".into()))
        }
    }

    fn index_of(proposals: Vec<(&str, ActionProposal)>) -> ActionIndex {
        let proposals: Vec<_> = proposals
            .into_iter()
            .map(|(agent, p)| (agent.to_string(), p))
            .collect();
        ActionAnalyzer::default()
            .analyze_round(Uuid::new_v4(), &proposals)
            .unwrap()
    }

    fn contention_pair() -> ActionIndex {
        index_of(vec![
            (
                "ava",
                ActionProposal::new("gather")
                    .with_resource("R1")
                    .with_priority(0.4),
            ),
            (
                "bram",
                ActionProposal::new("gather")
                    .with_resource("R1")
                    .with_priority(0.8),
            ),
        ])
    }

    #[test]
    fn test_candidate_tables() {
        let resolver = ConflictResolver::new();
        assert_eq!(
            resolver.candidates(ConflictKind::ResourceContention),
            vec![
                StrategyKind::PriorityBased,
                StrategyKind::Negotiation,
                StrategyKind::Sequential
            ]
        );
        assert_eq!(
            resolver.candidates(ConflictKind::Temporal),
            vec![StrategyKind::Sequential, StrategyKind::PriorityBased]
        );
    }

    #[test]
    fn test_empty_override_falls_back_to_random() {
        let mut overrides = HashMap::new();
        overrides.insert(ConflictKind::Social, vec![]);
        let resolver = ConflictResolver::with_overrides(&overrides);
        assert_eq!(
            resolver.candidates(ConflictKind::Social),
            vec![StrategyKind::Random]
        );
    }

    #[test]
    fn test_first_candidate_resolves_contention() {
        let index = contention_pair();
        let mut conflicts = ConflictDetector::default().detect(&index);
        let plan = ConflictResolver::new()
            .resolve_all(&mut conflicts, &index);

        let conflict = &conflicts[0];
        assert_eq!(conflict.state, ConflictState::Resolved);
        assert_eq!(conflict.strategy, Some(StrategyKind::PriorityBased));
        let bram = index.for_agent("bram").unwrap().action_id;
        let ava = index.for_agent("ava").unwrap().action_id;
        assert_eq!(conflict.outcome.as_ref().unwrap().winner(), Some(bram));
        assert!(plan.is_deferred(&ava));
        assert!(plan.is_pending(&index, &bram));
    }

    #[test]
    fn test_failure_falls_through_to_next_candidate() {
        let index = contention_pair();
        let mut conflicts = ConflictDetector::default().detect(&index);
        let mut resolver = ConflictResolver::new();
        resolver.register(Box::new(Refuses(StrategyKind::PriorityBased)));

        let plan = resolver.resolve_all(&mut conflicts, &index);
        let conflict = &conflicts[0];

        assert_eq!(conflict.state, ConflictState::Resolved);
        assert_eq!(conflict.strategy, Some(StrategyKind::Negotiation));
        assert_eq!(conflict.attempts.len(), 2);
        assert!(conflict.attempts[0].error.is_some());
        assert!(plan.deferred().is_empty());
    }

    #[test]
    fn test_exhausted_candidates_leave_conflict_unresolved() {
        let index = contention_pair();
        let mut conflicts = ConflictDetector::default().detect(&index);
        let mut resolver = ConflictResolver::new();
        for kind in [
            StrategyKind::PriorityBased,
            StrategyKind::Negotiation,
            StrategyKind::Sequential,
        ] {
            resolver.register(Box::new(Refuses(kind)));
        }

        resolver.resolve_all(&mut conflicts, &index);
        assert_eq!(conflicts[0].state, ConflictState::Unresolved);
        assert_eq!(conflicts[0].attempts.len(), 3);
    }

    #[test]
    fn test_merged_sequence_respects_every_order() {
        let mut overrides = HashMap::new();
        overrides.insert(
            ConflictKind::ResourceContention,
            vec![StrategyKind::Sequential],
        );
        let resolver = ConflictResolver::with_overrides(&overrides);
        let index = index_of(vec![
            ("ava", ActionProposal::new("gather").with_resource("R1").with_priority(0.1)),
            ("bram", ActionProposal::new("gather").with_resource("R1").with_resource("R2").with_priority(0.5)),
            ("cole", ActionProposal::new("gather").with_resource("R2").with_priority(0.95)),
        ]);
        let mut conflicts = ConflictDetector::default().detect(&index);
        assert_eq!(conflicts.len(), 2);

        let plan = resolver.resolve_all(&mut conflicts, &index);
        let id = |agent: &str| index.for_agent(agent).unwrap().action_id;
        // ava/bram puts bram first, bram/cole puts cole first
        assert_eq!(plan.sequence(), vec![id("cole"), id("bram"), id("ava")]);
    }

    #[test]
    fn test_contradictory_orders_still_sequence_everyone() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut plan = ResolutionPlan::new();
        plan.apply(&ResolutionOutcome::Ordered { order: vec![a, b] });
        plan.apply(&ResolutionOutcome::Ordered { order: vec![b, a] });
        plan.apply(&ResolutionOutcome::Ordered { order: vec![c, a] });
        assert_eq!(plan.sequence(), vec![c, a, b]);

        plan.apply(&ResolutionOutcome::Winner {
            winner: c,
            deferred: vec![b],
        });
        assert_eq!(plan.sequence(), vec![c, a]);
    }

    #[test]
    fn test_deferred_participant_supersedes_later_conflict() {
        // ava loses R1 to bram first (both conflicts 0.3, detection order)
        let index = index_of(vec![
            ("ava", ActionProposal::new("gather").with_resource("R1").with_resource("R2").with_priority(0.1)),
            ("bram", ActionProposal::new("gather").with_resource("R1").with_priority(0.95)),
            ("cole", ActionProposal::new("gather").with_resource("R2").with_priority(0.5)),
        ]);
        let mut conflicts = ConflictDetector::default().detect(&index);
        assert_eq!(conflicts.len(), 2);

        ConflictResolver::new()
            .resolve_all(&mut conflicts, &index);

        assert!(conflicts
            .iter()
            .all(|c| c.state == ConflictState::Resolved));
        assert!(matches!(
            conflicts[1].outcome,
            Some(ResolutionOutcome::Superseded { ref remaining }) if remaining.len() == 1
        ));
    }
}
