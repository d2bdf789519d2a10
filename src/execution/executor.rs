//! Batch Executor
//!
//! Runs one batch at a time. Inside a batch every action claims its tokens,
//! executes concurrently with its siblings under a per-action timeout and
//! releases its tokens when it finishes, whatever the outcome.

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use super::allocator::ResourceAllocator;
use super::batch::Batch;
use crate::action::{ActionKind, PendingAction};
use crate::agent::Agent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
    TimedOut,
    /// A required token was already held when the action started
    AllocationFailed,
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Succeeded)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Succeeded => write!(f, "succeeded"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::TimedOut => write!(f, "timed_out"),
            ExecutionStatus::AllocationFailed => write!(f, "allocation_failed"),
        }
    }
}

/// Outcome of one action's execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub action_id: Uuid,
    pub agent_id: String,
    pub kind: ActionKind,
    pub batch_index: usize,
    pub status: ExecutionStatus,
    pub summary: Option<String>,
    pub error: Option<String>,
    /// Active collaborations this action takes part in
    pub collaborations: Vec<Uuid>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    fn new(action: &PendingAction, batch_index: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            action_id: action.action_id,
            agent_id: action.agent_id.clone(),
            kind: action.kind.clone(),
            batch_index,
            status: ExecutionStatus::Failed,
            summary: None,
            error: None,
            collaborations: Vec::new(),
            started_at,
            finished_at: started_at,
            duration_ms: 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status.is_success()
    }
}

pub struct BatchExecutor {
    allocator: Arc<ResourceAllocator>,
    action_timeout: Duration,
}

impl BatchExecutor {
    pub fn new(allocator: Arc<ResourceAllocator>, action_timeout: Duration) -> Self {
        Self {
            allocator,
            action_timeout,
        }
    }

    pub fn allocator(&self) -> &Arc<ResourceAllocator> {
        &self.allocator
    }

    /// Execute every action of `batch` concurrently.
    ///
    /// Returns one result per action, in batch order. Never fails as a whole.
    pub async fn execute_batch(
        &self,
        batch: &Batch,
        agents: &HashMap<String, Arc<dyn Agent>>,
    ) -> Vec<ExecutionResult> {
        debug!(
            "Executing batch {} ({:?}, {} actions)",
            batch.index,
            batch.mode,
            batch.len()
        );

        let futures: Vec<_> = batch
            .actions
            .iter()
            .map(|action| self.execute_one(action, batch.index, agents.get(&action.agent_id)))
            .collect();

        join_all(futures).await
    }

    async fn execute_one(
        &self,
        action: &Arc<PendingAction>,
        batch_index: usize,
        agent: Option<&Arc<dyn Agent>>,
    ) -> ExecutionResult {
        let started = Instant::now();
        let mut result = ExecutionResult::new(action, batch_index, Utc::now());

        let Some(agent) = agent else {
            result.error = Some(format!("agent {} is not part of this round", action.agent_id));
            return Self::finish(result, started);
        };

        let mut guard = match self.allocator.claim_all(&action.tokens(), &action.agent_id) {
            Ok(guard) => guard,
            Err(e) => {
                warn!(
                    "Allocation failed for action {} of {} (detection gap): {}",
                    action.action_id, action.agent_id, e
                );
                result.status = ExecutionStatus::AllocationFailed;
                result.error = Some(e.to_string());
                return Self::finish(result, started);
            }
        };

        let call = AssertUnwindSafe(agent.execute_action(action)).catch_unwind();
        match tokio::time::timeout(self.action_timeout, call).await {
            Ok(Ok(Ok(outcome))) => {
                result.status = if outcome.success {
                    ExecutionStatus::Succeeded
                } else {
                    ExecutionStatus::Failed
                };
                if !outcome.success {
                    warn!(
                        "Action {} of {} reported failure: {}",
                        action.action_id, action.agent_id, outcome.summary
                    );
                }
                result.summary = Some(outcome.summary);
            }
            Ok(Ok(Err(e))) => {
                warn!(
                    "Action {} of {} failed: {}",
                    action.action_id, action.agent_id, e
                );
                result.status = ExecutionStatus::Failed;
                result.error = Some(e.to_string());
            }
            Ok(Err(_)) => {
                warn!("Action {} of {} panicked", action.action_id, action.agent_id);
                result.status = ExecutionStatus::Failed;
                result.error = Some("action panicked".to_string());
            }
            Err(_) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(
                    "Action {} of {} timed out after {}ms",
                    action.action_id, action.agent_id, elapsed_ms
                );
                result.status = ExecutionStatus::TimedOut;
                result.error = Some(format!("timed out after {}ms", elapsed_ms));
            }
        }

        guard.release();
        Self::finish(result, started)
    }

    fn finish(mut result: ExecutionResult, started: Instant) -> ExecutionResult {
        result.finished_at = Utc::now();
        result.duration_ms = started.elapsed().as_millis() as u64;
        result
    }
}
