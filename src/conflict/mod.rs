//! Conflict detection and resolution
//!
//! - `ConflictDetector` scans every pair of pending actions
//! - `ConflictResolver` walks each conflict through its candidate strategies
//! - `ResolutionPlan` collects deferrals and forced orderings for execution

mod detector;
mod resolver;
mod strategy;
mod types;

pub use detector::{
    ConflictDetector, CONFRONTATION_SEVERITY, DEFAULT_CONFLICT_THRESHOLD,
    LOCATION_SEVERITY_PER_SHARED, NARRATIVE_SEVERITY, RESOURCE_SEVERITY_PER_SHARED,
};
pub use resolver::{default_candidates, ConflictResolver, ResolutionPlan};
pub use strategy::{
    builtin_strategies, rank_by_priority, CollaborationStrategy, CompromiseStrategy,
    DemocraticStrategy, NegotiationStrategy, PriorityBasedStrategy, RandomStrategy,
    ResolutionStrategy, SequentialStrategy,
};
pub use types::{
    Conflict, ConflictKind, ConflictState, ResolutionOutcome, StrategyAttempt, StrategyKind,
};
