//! Conflict Detector - pairwise scan over the round's pending actions

use std::sync::Arc;
use tracing::debug;

use super::types::{Conflict, ConflictKind};
use crate::action::{ActionIndex, PendingAction};
use crate::agent::{NarrativeConsistency, NoNarrativeCheck};

pub const DEFAULT_CONFLICT_THRESHOLD: f64 = 0.3;

/// Severity per shared resource
pub const RESOURCE_SEVERITY_PER_SHARED: f64 = 0.3;
/// Severity per shared location
pub const LOCATION_SEVERITY_PER_SHARED: f64 = 0.4;
pub const CONFRONTATION_SEVERITY: f64 = 0.8;
pub const NARRATIVE_SEVERITY: f64 = 0.6;

const SEVERITY_EPSILON: f64 = 1e-9;

pub struct ConflictDetector {
    threshold: f64,
    narrative: Arc<dyn NarrativeConsistency>,
}

impl ConflictDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            narrative: Arc::new(NoNarrativeCheck),
        }
    }

    pub fn with_narrative_check(mut self, narrative: Arc<dyn NarrativeConsistency>) -> Self {
        self.narrative = narrative;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Every unordered pair, in collection order. O(n^2); rounds are small.
    pub fn detect(&self, index: &ActionIndex) -> Vec<Conflict> {
        let actions = index.as_slice();
        let mut conflicts = Vec::new();

        for (i, a) in actions.iter().enumerate() {
            for b in &actions[i + 1..] {
                let Some((kind, severity)) = self.assess_pair(a, b) else {
                    continue;
                };
                if severity + SEVERITY_EPSILON < self.threshold {
                    continue;
                }
                let conflict = Conflict::new(
                    kind,
                    severity,
                    vec![a.action_id, b.action_id],
                    vec![a.agent_id.clone(), b.agent_id.clone()],
                );
                debug!(
                    "Detected {} conflict between {} and {} (severity {:.2})",
                    kind, a.agent_id, b.agent_id, conflict.severity
                );
                conflicts.push(conflict);
            }
        }

        conflicts
    }

    /// Highest-severity reason the two actions clash, if any.
    ///
    /// On equal severity the earlier check wins: resource, location,
    /// confrontation, narrative.
    pub fn assess_pair(
        &self,
        a: &PendingAction,
        b: &PendingAction,
    ) -> Option<(ConflictKind, f64)> {
        let mut best: Option<(ConflictKind, f64)> = None;
        let mut consider = |kind: ConflictKind, severity: f64| {
            if severity <= 0.0 {
                return;
            }
            let severity = severity.min(1.0);
            if best.map_or(true, |(_, current)| severity > current + SEVERITY_EPSILON) {
                best = Some((kind, severity));
            }
        };

        let shared_resources = a.shared_resources(b);
        consider(
            ConflictKind::ResourceContention,
            RESOURCE_SEVERITY_PER_SHARED * shared_resources as f64,
        );

        let shared_locations = a.shared_locations(b);
        consider(
            ConflictKind::Location,
            LOCATION_SEVERITY_PER_SHARED * shared_locations as f64,
        );

        if a.mutually_engaged(b) && a.kind.opposes(&b.kind) {
            consider(ConflictKind::DirectConfrontation, CONFRONTATION_SEVERITY);
        }

        if self.narrative.is_inconsistent(a, b) {
            consider(ConflictKind::NarrativeInconsistency, NARRATIVE_SEVERITY);
        }

        best
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CONFLICT_THRESHOLD)
    }
}
