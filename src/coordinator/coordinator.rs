//! Coordinator - round orchestrator for parallel agents
//!
//! One `coordinate_round` call runs a full cycle:
//!   - collect one proposal per agent (concurrent, timeout-bound)
//!   - analyze proposals into pending actions
//!   - detect conflicts and collaboration opportunities
//!   - resolve conflicts, most severe first
//!   - form collaborations from surviving opportunities
//!   - execute batches one after another under token arbitration
//!
//! Active conflicts, active collaborations and histories are owned by the
//! coordinator and only touched between batches.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::action::{ActionAnalyzer, ActionIndex, HeuristicTables, PendingAction};
use crate::agent::{Agent, NarrativeConsistency, RelationshipLookup};
use crate::collaboration::{Collaboration, CollaborationFormer, CollaborationIdentifier};
use crate::conflict::{
    Conflict, ConflictDetector, ConflictResolver, ConflictState, ResolutionPlan,
    ResolutionStrategy,
};
use crate::error::{CoordError, Result};
use crate::execution::{BatchExecutor, BatchPlanner, ExecutionResult, ResourceAllocator};
use crate::history::BoundedHistory;

use super::collector::DecisionCollector;
use super::config::CoordinatorConfig;
use super::state::{CoordinatorStats, RoundMetrics, RoundResult};

/// A pending action after its round, with its execution result.
/// `result` is `None` when conflict resolution deferred the action.
#[derive(Debug, Clone)]
pub struct CompletedAction {
    pub action: Arc<PendingAction>,
    pub result: Option<ExecutionResult>,
}

impl CompletedAction {
    pub fn was_deferred(&self) -> bool {
        self.result.is_none()
    }
}

pub struct Coordinator {
    config: CoordinatorConfig,
    collector: DecisionCollector,
    analyzer: ActionAnalyzer,
    detector: ConflictDetector,
    identifier: CollaborationIdentifier,
    resolver: ConflictResolver,
    former: CollaborationFormer,
    executor: BatchExecutor,
    round_counter: u64,
    /// Detected this round and not yet resolved, keyed by conflict id
    active_conflicts: HashMap<String, Conflict>,
    /// Keyed by opportunity id
    active_collaborations: HashMap<Uuid, Collaboration>,
    completed_actions: BoundedHistory<CompletedAction>,
    resolved_conflicts: BoundedHistory<Conflict>,
    unresolved_conflicts: BoundedHistory<Conflict>,
    collaboration_history: BoundedHistory<Collaboration>,
    round_history: BoundedHistory<RoundMetrics>,
    stats: CoordinatorStats,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;

        let tables = HeuristicTables::with_overrides(&config.heuristics);
        let allocator = Arc::new(ResourceAllocator::new());

        Ok(Self {
            collector: DecisionCollector::new(config.decision_timeout()),
            analyzer: ActionAnalyzer::new(tables),
            detector: ConflictDetector::new(config.conflict_threshold),
            identifier: CollaborationIdentifier::new(
                config.synergy_threshold,
                config.triple_affinity_threshold,
            ),
            resolver: ConflictResolver::with_overrides(&config.strategy_overrides),
            former: CollaborationFormer::new(),
            executor: BatchExecutor::new(allocator, config.action_timeout()),
            round_counter: 0,
            active_conflicts: HashMap::new(),
            active_collaborations: HashMap::new(),
            completed_actions: BoundedHistory::new(config.completed_history_limit),
            resolved_conflicts: BoundedHistory::new(config.resolved_history_limit),
            unresolved_conflicts: BoundedHistory::new(config.resolved_history_limit),
            collaboration_history: BoundedHistory::new(config.collaboration_history_limit),
            round_history: BoundedHistory::new(config.round_history_limit),
            stats: CoordinatorStats::default(),
            config,
        })
    }

    pub fn with_relationships(mut self, relationships: Arc<dyn RelationshipLookup>) -> Self {
        self.identifier = self.identifier.with_relationships(relationships);
        self
    }

    pub fn with_narrative_check(mut self, narrative: Arc<dyn NarrativeConsistency>) -> Self {
        self.detector = self.detector.with_narrative_check(narrative);
        self
    }

    /// Replace the handler for the strategy `handler.kind()`
    pub fn register_strategy(&mut self, handler: Box<dyn ResolutionStrategy>) {
        self.resolver.register(handler);
    }

    /// Run one full coordination round.
    ///
    /// Never fails: agent and action failures are counted in the result,
    /// and setup failures are reported through `RoundResult::error`.
    pub async fn coordinate_round(
        &mut self,
        agents: &[Arc<dyn Agent>],
        shared: &serde_json::Value,
    ) -> RoundResult {
        self.round_counter += 1;
        let round_id = Uuid::new_v4();
        let round_number = self.round_counter;
        let span = info_span!("round", %round_id, round_number);

        self.run_round(round_id, round_number, agents, shared)
            .instrument(span)
            .await
    }

    async fn run_round(
        &mut self,
        round_id: Uuid,
        round_number: u64,
        agents: &[Arc<dyn Agent>],
        shared: &serde_json::Value,
    ) -> RoundResult {
        let started = Instant::now();
        let mut round = RoundResult::empty(round_id, round_number, agents.len());
        info!("Round {} starting with {} agents", round_number, agents.len());

        if let Err(e) = Self::check_agents(agents) {
            return self.abort_round(round, started, e);
        }

        // Phase 1: decisions
        let report = self
            .collector
            .collect(round_id, round_number, agents, shared)
            .await;
        round.decision_failures = report.failures.len();
        round.decision_timeouts = report.timeouts();
        round.abstentions = report.abstained.len();

        // Phase 2: analysis
        let index = match self.analyzer.analyze_round(round_id, &report.proposals) {
            Ok(index) => index,
            Err(e) => return self.abort_round(round, started, e),
        };
        round.total_actions = index.len();

        // Phase 3: detection
        let detected = self.detector.detect(&index);
        let opportunities = self.identifier.identify(&index);
        round.opportunities_identified = opportunities.len();

        // Phase 4: resolution
        let plan = self.resolve_conflicts(detected, &index, &mut round);

        // Phase 5: collaborations
        let formed = self.former.form(opportunities, &index, &plan);
        round.collaborations_formed = formed.len();
        for collaboration in formed {
            debug!(
                "Formed {} collaboration {} ({})",
                collaboration.kind,
                collaboration.collaboration_id,
                collaboration.participant_agents.join(", ")
            );
            self.active_collaborations
                .insert(collaboration.collaboration_id, collaboration);
        }

        // Phase 6: execution
        let batches = BatchPlanner::plan(&index, &plan);
        let agent_map: HashMap<String, Arc<dyn Agent>> = agents
            .iter()
            .map(|a| (a.id().to_string(), Arc::clone(a)))
            .collect();

        for batch in &batches {
            let results = self.executor.execute_batch(batch, &agent_map).await;
            round.batches_executed += 1;
            for mut result in results {
                result.collaborations = self.collaborations_of(&result.action_id);
                if let Some(action) = index.get(&result.action_id) {
                    self.completed_actions.push(CompletedAction {
                        action: Arc::clone(action),
                        result: Some(result.clone()),
                    });
                }
                round.results.push(result);
            }
        }

        for action in index.iter().filter(|a| plan.is_deferred(&a.action_id)) {
            round.deferred_actions += 1;
            self.completed_actions.push(CompletedAction {
                action: Arc::clone(action),
                result: None,
            });
        }

        self.close_collaborations(&mut round);
        round.tally_results();
        round.tally_conflicts();

        let allocator = self.executor.allocator();
        if !allocator.is_idle() || !allocator.is_balanced() {
            error!(
                "Allocator out of balance after round {}: {} allocations, {} releases, held {:?}",
                round_number,
                allocator.allocation_count(),
                allocator.release_count(),
                allocator.held_tokens()
            );
        }

        self.finish_round(round, started)
    }

    /// Conflicts sit in the active set while the resolver walks them, then
    /// move to the resolved or unresolved history.
    fn resolve_conflicts(
        &mut self,
        mut detected: Vec<Conflict>,
        index: &ActionIndex,
        round: &mut RoundResult,
    ) -> ResolutionPlan {
        for conflict in &detected {
            self.active_conflicts
                .insert(conflict.conflict_id.clone(), conflict.clone());
        }

        let plan = self.resolver.resolve_all(&mut detected, index);

        for conflict in detected {
            self.active_conflicts.remove(&conflict.conflict_id);
            match conflict.state {
                ConflictState::Resolved => self.resolved_conflicts.push(conflict.clone()),
                _ => self.unresolved_conflicts.push(conflict.clone()),
            }
            round.conflicts.push(conflict);
        }

        plan
    }

    fn collaborations_of(&self, action_id: &Uuid) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .active_collaborations
            .values()
            .filter(|c| c.includes(action_id))
            .map(|c| c.collaboration_id)
            .collect();
        ids.sort();
        ids
    }

    /// Close every active collaboration against this round's results
    fn close_collaborations(&mut self, round: &mut RoundResult) {
        let succeeded: HashSet<Uuid> = round
            .results
            .iter()
            .filter(|r| r.succeeded())
            .map(|r| r.action_id)
            .collect();

        let mut closed: Vec<Collaboration> = self
            .active_collaborations
            .drain()
            .map(|(_, mut collaboration)| {
                let all_succeeded = collaboration
                    .participants
                    .iter()
                    .all(|id| succeeded.contains(id));
                collaboration.close(all_succeeded);
                collaboration
            })
            .collect();
        closed.sort_by_key(|c| c.formed_at);

        for collaboration in closed {
            debug!(
                "Collaboration {} closed as {:?}",
                collaboration.collaboration_id, collaboration.status
            );
            self.collaboration_history.push(collaboration.clone());
            round.collaborations.push(collaboration);
        }
    }

    fn check_agents(agents: &[Arc<dyn Agent>]) -> Result<()> {
        let mut seen = HashSet::new();
        for (position, agent) in agents.iter().enumerate() {
            let id = agent.id();
            if id.trim().is_empty() {
                return Err(CoordError::InvalidConfig(format!(
                    "agent at position {} has an empty id",
                    position
                )));
            }
            if !seen.insert(id) {
                return Err(CoordError::DuplicateAgent(id.to_string()));
            }
        }
        Ok(())
    }

    fn abort_round(&mut self, mut round: RoundResult, started: Instant, err: CoordError) -> RoundResult {
        error!("Round {} setup failed: {}", round.round_number, err);
        round.error = Some(err.to_string());
        self.finish_round(round, started)
    }

    fn finish_round(&mut self, mut round: RoundResult, started: Instant) -> RoundResult {
        round.completed_at = chrono::Utc::now();
        round.duration_ms = started.elapsed().as_millis() as u64;

        self.stats.record(&round);
        self.round_history.push(round.metrics());

        if round.conflicts_unresolved > 0 {
            warn!(
                "Round {} finished with {} unresolved conflicts",
                round.round_number, round.conflicts_unresolved
            );
        }
        info!(
            "Round {} complete: {}/{} actions succeeded, {} deferred, {} conflicts ({} resolved), {} collaborations, {}ms",
            round.round_number,
            round.successful_actions,
            round.total_actions,
            round.deferred_actions,
            round.conflicts_detected,
            round.conflicts_resolved,
            round.collaborations_formed,
            round.duration_ms
        );
        round
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Number of rounds started so far
    pub fn rounds_run(&self) -> u64 {
        self.round_counter
    }

    pub fn stats(&self) -> &CoordinatorStats {
        &self.stats
    }

    pub fn allocator(&self) -> &Arc<ResourceAllocator> {
        self.executor.allocator()
    }

    pub fn active_conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.active_conflicts.values()
    }

    pub fn active_collaborations(&self) -> impl Iterator<Item = &Collaboration> {
        self.active_collaborations.values()
    }

    pub fn completed_actions(&self) -> &BoundedHistory<CompletedAction> {
        &self.completed_actions
    }

    pub fn resolved_conflicts(&self) -> &BoundedHistory<Conflict> {
        &self.resolved_conflicts
    }

    pub fn unresolved_conflicts(&self) -> &BoundedHistory<Conflict> {
        &self.unresolved_conflicts
    }

    pub fn collaboration_history(&self) -> &BoundedHistory<Collaboration> {
        &self.collaboration_history
    }

    pub fn round_history(&self) -> &BoundedHistory<RoundMetrics> {
        &self.round_history
    }
}
