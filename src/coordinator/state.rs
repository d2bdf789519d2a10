//! Coordinator State - round results, per-round metrics and cumulative stats

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::collaboration::Collaboration;
use crate::conflict::{Conflict, ConflictKind, ConflictState, StrategyKind};
use crate::execution::{ExecutionResult, ExecutionStatus};

/// Everything that happened in one call to `coordinate_round`
#[derive(Debug, Clone, Serialize)]
pub struct RoundResult {
    pub round_id: Uuid,
    pub round_number: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_agents: usize,
    /// Pending actions created this round
    pub total_actions: usize,
    pub successful_actions: usize,
    pub failed_actions: usize,
    pub timed_out_actions: usize,
    pub allocation_failures: usize,
    /// Suppressed by conflict resolution
    pub deferred_actions: usize,
    pub decision_failures: usize,
    pub decision_timeouts: usize,
    pub abstentions: usize,
    pub conflicts_detected: usize,
    pub conflicts_resolved: usize,
    pub conflicts_unresolved: usize,
    pub opportunities_identified: usize,
    pub collaborations_formed: usize,
    pub batches_executed: usize,
    pub duration_ms: u64,
    pub conflicts: Vec<Conflict>,
    pub collaborations: Vec<Collaboration>,
    pub results: Vec<ExecutionResult>,
    /// Set only when the round could not be set up
    pub error: Option<String>,
}

impl RoundResult {
    pub(crate) fn empty(round_id: Uuid, round_number: u64, total_agents: usize) -> Self {
        let now = Utc::now();
        Self {
            round_id,
            round_number,
            started_at: now,
            completed_at: now,
            total_agents,
            total_actions: 0,
            successful_actions: 0,
            failed_actions: 0,
            timed_out_actions: 0,
            allocation_failures: 0,
            deferred_actions: 0,
            decision_failures: 0,
            decision_timeouts: 0,
            abstentions: 0,
            conflicts_detected: 0,
            conflicts_resolved: 0,
            conflicts_unresolved: 0,
            opportunities_identified: 0,
            collaborations_formed: 0,
            batches_executed: 0,
            duration_ms: 0,
            conflicts: Vec::new(),
            collaborations: Vec::new(),
            results: Vec::new(),
            error: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// Fold execution results into the action counters
    pub(crate) fn tally_results(&mut self) {
        for result in &self.results {
            match result.status {
                ExecutionStatus::Succeeded => self.successful_actions += 1,
                ExecutionStatus::Failed => self.failed_actions += 1,
                ExecutionStatus::TimedOut => self.timed_out_actions += 1,
                ExecutionStatus::AllocationFailed => self.allocation_failures += 1,
            }
        }
    }

    pub(crate) fn tally_conflicts(&mut self) {
        self.conflicts_detected = self.conflicts.len();
        self.conflicts_resolved = self
            .conflicts
            .iter()
            .filter(|c| c.state == ConflictState::Resolved)
            .count();
        self.conflicts_unresolved = self
            .conflicts
            .iter()
            .filter(|c| c.state == ConflictState::Unresolved)
            .count();
    }

    pub fn metrics(&self) -> RoundMetrics {
        RoundMetrics {
            round_id: self.round_id,
            round_number: self.round_number,
            completed_at: self.completed_at,
            total_agents: self.total_agents,
            total_actions: self.total_actions,
            successful_actions: self.successful_actions,
            failed_actions: self.failed_actions + self.timed_out_actions + self.allocation_failures,
            deferred_actions: self.deferred_actions,
            conflicts_detected: self.conflicts_detected,
            conflicts_resolved: self.conflicts_resolved,
            collaborations_formed: self.collaborations_formed,
            duration_ms: self.duration_ms,
            success_rate: if self.total_actions == 0 {
                0.0
            } else {
                self.successful_actions as f64 / self.total_actions as f64
            },
            error: self.error.clone(),
        }
    }
}

/// Compact per-round summary kept in the round history
#[derive(Debug, Clone, Serialize)]
pub struct RoundMetrics {
    pub round_id: Uuid,
    pub round_number: u64,
    pub completed_at: DateTime<Utc>,
    pub total_agents: usize,
    pub total_actions: usize,
    pub successful_actions: usize,
    /// Failed, timed out or refused at allocation
    pub failed_actions: usize,
    pub deferred_actions: usize,
    pub conflicts_detected: usize,
    pub conflicts_resolved: usize,
    pub collaborations_formed: usize,
    pub duration_ms: u64,
    pub success_rate: f64,
    pub error: Option<String>,
}

/// Cumulative counters across every round a coordinator has run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoordinatorStats {
    pub rounds: u64,
    pub failed_rounds: u64,
    pub actions: u64,
    pub successful_actions: u64,
    pub failed_actions: u64,
    pub timed_out_actions: u64,
    pub allocation_failures: u64,
    pub deferred_actions: u64,
    pub decision_failures: u64,
    pub decision_timeouts: u64,
    pub conflicts_by_kind: BTreeMap<ConflictKind, u64>,
    /// Strategy that resolved each conflict
    pub strategy_usage: BTreeMap<StrategyKind, u64>,
    pub superseded_conflicts: u64,
    pub unresolved_conflicts: u64,
    pub collaborations_formed: u64,
}

impl CoordinatorStats {
    pub fn record(&mut self, round: &RoundResult) {
        self.rounds += 1;
        if round.failed() {
            self.failed_rounds += 1;
        }
        self.actions += round.total_actions as u64;
        self.successful_actions += round.successful_actions as u64;
        self.failed_actions += round.failed_actions as u64;
        self.timed_out_actions += round.timed_out_actions as u64;
        self.allocation_failures += round.allocation_failures as u64;
        self.deferred_actions += round.deferred_actions as u64;
        self.decision_failures += round.decision_failures as u64;
        self.decision_timeouts += round.decision_timeouts as u64;
        self.collaborations_formed += round.collaborations_formed as u64;

        for conflict in &round.conflicts {
            *self.conflicts_by_kind.entry(conflict.kind).or_insert(0) += 1;
            match (conflict.state, conflict.strategy) {
                (ConflictState::Resolved, Some(strategy)) => {
                    *self.strategy_usage.entry(strategy).or_insert(0) += 1;
                }
                (ConflictState::Resolved, None) => self.superseded_conflicts += 1,
                (ConflictState::Unresolved, _) => self.unresolved_conflicts += 1,
                _ => {}
            }
        }
    }

    pub fn total_conflicts(&self) -> u64 {
        self.conflicts_by_kind.values().sum()
    }
}

impl std::fmt::Display for CoordinatorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rounds={} actions={} ok={} failed={} timed_out={} conflicts={} unresolved={} collaborations={}",
            self.rounds,
            self.actions,
            self.successful_actions,
            self.failed_actions,
            self.timed_out_actions,
            self.total_conflicts(),
            self.unresolved_conflicts,
            self.collaborations_formed
        )
    }
}
