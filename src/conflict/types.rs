//! Conflict types and the resolution state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoordError, Result};

/// Conflict category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    ResourceContention,
    Location,
    DirectConfrontation,
    NarrativeInconsistency,
    Temporal,
    Social,
}

impl ConflictKind {
    pub const ALL: [ConflictKind; 6] = [
        ConflictKind::ResourceContention,
        ConflictKind::Location,
        ConflictKind::DirectConfrontation,
        ConflictKind::NarrativeInconsistency,
        ConflictKind::Temporal,
        ConflictKind::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::ResourceContention => "resource_contention",
            ConflictKind::Location => "location",
            ConflictKind::DirectConfrontation => "direct_confrontation",
            ConflictKind::NarrativeInconsistency => "narrative_inconsistency",
            ConflictKind::Temporal => "temporal",
            ConflictKind::Social => "social",
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    PriorityBased,
    Sequential,
    Negotiation,
    Compromise,
    Collaboration,
    Democratic,
    Random,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::PriorityBased => write!(f, "priority_based"),
            StrategyKind::Sequential => write!(f, "sequential"),
            StrategyKind::Negotiation => write!(f, "negotiation"),
            StrategyKind::Compromise => write!(f, "compromise"),
            StrategyKind::Collaboration => write!(f, "collaboration"),
            StrategyKind::Democratic => write!(f, "democratic"),
            StrategyKind::Random => write!(f, "random"),
        }
    }
}

/// DETECTED -> STRATEGY_SELECTED -> RESOLVED | UNRESOLVED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictState {
    Detected,
    StrategySelected,
    Resolved,
    Unresolved,
}

impl ConflictState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConflictState::Resolved | ConflictState::Unresolved)
    }
}

impl std::fmt::Display for ConflictState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictState::Detected => write!(f, "DETECTED"),
            ConflictState::StrategySelected => write!(f, "STRATEGY_SELECTED"),
            ConflictState::Resolved => write!(f, "RESOLVED"),
            ConflictState::Unresolved => write!(f, "UNRESOLVED"),
        }
    }
}

/// What a successful strategy decided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// One action proceeds, the rest sit out this round
    Winner { winner: Uuid, deferred: Vec<Uuid> },
    /// All proceed, one at a time, in this order
    Ordered { order: Vec<Uuid> },
    /// Qualitative settlement; the action set is unchanged
    Agreement { summary: String },
    /// Equal-weight vote; the action set is unchanged
    Vote {
        winner: Uuid,
        tally: Vec<(Uuid, usize)>,
        tie_broken: bool,
    },
    /// Fallback pick; the action set is unchanged
    Chosen { winner: Uuid },
    /// Earlier resolutions left fewer than two involved actions pending
    Superseded { remaining: Vec<Uuid> },
}

impl ResolutionOutcome {
    pub fn winner(&self) -> Option<Uuid> {
        match self {
            ResolutionOutcome::Winner { winner, .. }
            | ResolutionOutcome::Vote { winner, .. }
            | ResolutionOutcome::Chosen { winner } => Some(*winner),
            _ => None,
        }
    }
}

/// One strategy tried against a conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: StrategyKind,
    pub error: Option<String>,
}

/// Detected incompatibility between two or more pending actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    /// Derived from kind and participants, so detection is reproducible
    pub conflict_id: String,
    pub kind: ConflictKind,
    pub severity: f64,
    pub involved: Vec<Uuid>,
    pub involved_agents: Vec<String>,
    pub state: ConflictState,
    pub strategy: Option<StrategyKind>,
    pub outcome: Option<ResolutionOutcome>,
    pub attempts: Vec<StrategyAttempt>,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Conflict {
    pub fn new(
        kind: ConflictKind,
        severity: f64,
        involved: Vec<Uuid>,
        involved_agents: Vec<String>,
    ) -> Self {
        let conflict_id = format!(
            "{}:{}",
            kind.as_str(),
            involved
                .iter()
                .map(|id| id.simple().to_string())
                .collect::<Vec<_>>()
                .join(":")
        );
        Self {
            conflict_id,
            kind,
            severity: severity.clamp(0.0, 1.0),
            involved,
            involved_agents,
            state: ConflictState::Detected,
            strategy: None,
            outcome: None,
            attempts: Vec::new(),
            detected_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn involves(&self, action_id: &Uuid) -> bool {
        self.involved.contains(action_id)
    }

    pub fn select_strategy(&mut self, strategy: StrategyKind) -> Result<()> {
        match self.state {
            ConflictState::Detected | ConflictState::StrategySelected => {
                self.state = ConflictState::StrategySelected;
                self.strategy = Some(strategy);
                Ok(())
            }
            other => Err(self.invalid(other, ConflictState::StrategySelected)),
        }
    }

    /// Record a failed attempt with the currently selected strategy
    pub fn record_failure(&mut self, error: impl Into<String>) {
        if let Some(strategy) = self.strategy {
            self.attempts.push(StrategyAttempt {
                strategy,
                error: Some(error.into()),
            });
        }
    }

    pub fn resolve(&mut self, outcome: ResolutionOutcome) -> Result<()> {
        let allowed = match self.state {
            ConflictState::StrategySelected => true,
            ConflictState::Detected => matches!(outcome, ResolutionOutcome::Superseded { .. }),
            _ => false,
        };
        if !allowed {
            return Err(self.invalid(self.state, ConflictState::Resolved));
        }

        if let Some(strategy) = self.strategy {
            self.attempts.push(StrategyAttempt {
                strategy,
                error: None,
            });
        }
        self.state = ConflictState::Resolved;
        self.outcome = Some(outcome);
        self.resolved_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_unresolved(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(self.invalid(self.state, ConflictState::Unresolved));
        }
        self.state = ConflictState::Unresolved;
        self.resolved_at = Some(Utc::now());
        Ok(())
    }

    fn invalid(&self, from: ConflictState, to: ConflictState) -> CoordError {
        CoordError::InvalidStateTransition {
            from: format!("{} ({})", from, self.conflict_id),
            to: to.to_string(),
        }
    }
}
