//! Round Coordinator
//!
//! Sequences decision collection, analysis, conflict resolution,
//! collaboration forming and batched execution for a set of agents,
//! and keeps bounded histories and cumulative stats across rounds.

pub mod collector;
pub mod config;
pub mod coordinator;
pub mod state;

pub use collector::{CollectionReport, DecisionCollector, DecisionFailure};
pub use config::CoordinatorConfig;
pub use coordinator::{CompletedAction, Coordinator};
pub use state::{CoordinatorStats, RoundMetrics, RoundResult};
