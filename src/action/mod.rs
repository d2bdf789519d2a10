//! Action model and analysis
//!
//! Raw proposals are normalised into immutable `PendingAction`s scored from
//! versioned lookup tables, and registered in the round's `ActionIndex`.

mod analyzer;
mod heuristics;
mod types;

pub use analyzer::{ActionAnalyzer, ActionIndex};
pub use heuristics::{
    HeuristicTables, KindProfile, DEFAULT_AFFINITY, DEFAULT_CONFLICT_RISK, DEFAULT_PRIORITY,
    HEURISTICS_VERSION,
};
pub use types::{
    ActionKind, GoalGroup, PendingAction, PriorityClass, LOCATION_TOKEN_PREFIX,
    RESOURCE_TOKEN_PREFIX,
};
