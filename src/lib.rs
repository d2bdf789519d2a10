pub mod action;
pub mod agent;
pub mod collaboration;
pub mod config;
pub mod conflict;
pub mod coordinator;
pub mod error;
pub mod execution;
pub mod history;
pub mod logging;

pub use action::{ActionAnalyzer, ActionIndex, ActionKind, HeuristicTables, PendingAction, PriorityClass};
pub use agent::{
    ActionOutcome, ActionProposal, Agent, DecisionContext, NarrativeConsistency,
    RelationshipLookup, StaticRelationships,
};
pub use collaboration::{
    Collaboration, CollaborationKind, CollaborationOpportunity, CollaborationStatus,
};
pub use config::{AppConfig, LoggingConfig};
pub use conflict::{
    Conflict, ConflictKind, ConflictState, ResolutionOutcome, ResolutionStrategy, StrategyKind,
};
pub use coordinator::{
    CompletedAction, Coordinator, CoordinatorConfig, CoordinatorStats, RoundMetrics, RoundResult,
};
pub use error::{CoordError, Result};
pub use execution::{ExecutionResult, ExecutionStatus, ResourceAllocator};
pub use history::BoundedHistory;
