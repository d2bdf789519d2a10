//! Agent boundary
//!
//! Agents are opaque decision makers. The coordinator asks each one for a
//! single proposal per round and later asks it to carry out the action
//! that survived conflict resolution.

mod traits;
mod types;

pub use traits::{
    Agent, NarrativeConsistency, NeutralRelationships, NoNarrativeCheck, RelationshipLookup,
    StaticRelationships,
};
pub use types::{ActionOutcome, ActionProposal, DecisionContext};
