//! Decision Collector - one bounded decision call per agent, concurrently

use chrono::Utc;
use futures_util::future::join_all;
use futures_util::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::agent::{ActionProposal, Agent, DecisionContext};
use crate::error::CoordError;

/// Agent excluded from the round
#[derive(Debug, Clone, Serialize)]
pub struct DecisionFailure {
    pub agent_id: String,
    pub reason: String,
    pub timed_out: bool,
}

/// Everything gathered from one collection pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionReport {
    /// In the order agents were supplied
    pub proposals: Vec<(String, ActionProposal)>,
    pub failures: Vec<DecisionFailure>,
    pub abstained: Vec<String>,
}

impl CollectionReport {
    pub fn timeouts(&self) -> usize {
        self.failures.iter().filter(|f| f.timed_out).count()
    }
}

enum Decision {
    Proposed(ActionProposal),
    Abstained,
    Failed(DecisionFailure),
}

#[derive(Debug, Clone)]
pub struct DecisionCollector {
    timeout: Duration,
}

impl DecisionCollector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn collect(
        &self,
        round_id: Uuid,
        round_number: u64,
        agents: &[Arc<dyn Agent>],
        shared: &serde_json::Value,
    ) -> CollectionReport {
        let ids: Vec<String> = agents.iter().map(|a| a.id().to_string()).collect();

        let futures: Vec<_> = agents
            .iter()
            .map(|agent| {
                let ctx = DecisionContext {
                    round_id,
                    round_number,
                    agent_id: agent.id().to_string(),
                    co_participants: ids.iter().filter(|id| *id != agent.id()).cloned().collect(),
                    shared: shared.clone(),
                    issued_at: Utc::now(),
                };
                self.decide(Arc::clone(agent), ctx)
            })
            .collect();

        let mut report = CollectionReport::default();
        for (agent_id, decision) in ids.into_iter().zip(join_all(futures).await) {
            match decision {
                Decision::Proposed(proposal) => report.proposals.push((agent_id, proposal)),
                Decision::Abstained => report.abstained.push(agent_id),
                Decision::Failed(failure) => report.failures.push(failure),
            }
        }

        debug!(
            "Collected {} proposals ({} failed, {} abstained)",
            report.proposals.len(),
            report.failures.len(),
            report.abstained.len()
        );
        report
    }

    async fn decide(&self, agent: Arc<dyn Agent>, ctx: DecisionContext) -> Decision {
        let started = Instant::now();
        let agent_id = ctx.agent_id.clone();
        let call = AssertUnwindSafe(agent.propose_action(&ctx)).catch_unwind();

        let error = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(Ok(Some(proposal)))) => return Decision::Proposed(proposal),
            Ok(Ok(Ok(None))) => {
                debug!("Agent {} abstained", agent_id);
                return Decision::Abstained;
            }
            Ok(Ok(Err(e))) => CoordError::AgentFailed {
                agent_id: agent_id.clone(),
                reason: e.to_string(),
            },
            Ok(Err(_)) => CoordError::AgentFailed {
                agent_id: agent_id.clone(),
                reason: "decision call panicked".into(),
            },
            Err(_) => CoordError::AgentTimeout {
                agent_id: agent_id.clone(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
        };

        warn!("Excluding agent from round: {}", error);
        Decision::Failed(DecisionFailure {
            timed_out: matches!(error, CoordError::AgentTimeout { .. }),
            reason: error.to_string(),
            agent_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Probe {
        id: String,
        delay: Duration,
        reply: Option<&'static str>,
        seen: Mutex<Option<DecisionContext>>,
    }

    impl Probe {
        fn new(id: &str, delay_ms: u64, reply: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                delay: Duration::from_millis(delay_ms),
                reply,
                seen: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Agent for Probe {
        fn id(&self) -> &str {
            &self.id
        }

        async fn propose_action(&self, ctx: &DecisionContext) -> Result<Option<ActionProposal>> {
            *self.seen.lock().unwrap() = Some(ctx.clone());
            tokio::time::sleep(self.delay).await;
            match self.reply {
                Some("error") => Err(CoordError::Internal("model unavailable".into())),
                Some(kind) => Ok(Some(ActionProposal::new(kind))),
                None => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn test_collects_and_isolates_failures() {
        let ava = Probe::new("ava", 0, Some("investigate"));
        let bram = Probe::new("bram", 500, Some("attack"));
        let cole = Probe::new("cole", 0, Some("error"));
        let dana = Probe::new("dana", 0, None);
        let agents: Vec<Arc<dyn Agent>> = vec![ava.clone(), bram, cole, dana];

        let report = DecisionCollector::new(Duration::from_millis(50))
            .collect(Uuid::new_v4(), 1, &agents, &serde_json::json!({"scene": "docks"}))
            .await;

        assert_eq!(report.proposals.len(), 1);
        assert_eq!(report.proposals[0].0, "ava");
        assert_eq!(report.proposals[0].1.action_type, "investigate");
        assert_eq!(report.abstained, vec!["dana"]);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.timeouts(), 1);

        let timed_out = report.failures.iter().find(|f| f.timed_out).unwrap();
        assert_eq!(timed_out.agent_id, "bram");
        let failed = report.failures.iter().find(|f| !f.timed_out).unwrap();
        assert_eq!(failed.agent_id, "cole");
        assert!(failed.reason.contains("model unavailable"));

        let ctx = ava.seen.lock().unwrap().clone().unwrap();
        assert_eq!(ctx.co_participants, vec!["bram", "cole", "dana"]);
        assert_eq!(ctx.shared["scene"], "docks");
    }

    #[tokio::test]
    async fn test_empty_agent_list() {
        let report = DecisionCollector::new(Duration::from_millis(50))
            .collect(Uuid::new_v4(), 1, &[], &serde_json::Value::Null)
            .await;
        assert!(report.proposals.is_empty());
        assert!(report.failures.is_empty());
    }
}
