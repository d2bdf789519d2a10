//! Collaboration identification and forming

mod former;
mod identifier;
mod types;

pub use former::CollaborationFormer;
pub use identifier::{
    CollaborationIdentifier, DEFAULT_SYNERGY_THRESHOLD, DEFAULT_TRIPLE_AFFINITY_THRESHOLD,
    PAIR_BENEFIT_MULTIPLIER, TRIPLE_BENEFIT,
};
pub use types::{Collaboration, CollaborationKind, CollaborationOpportunity, CollaborationStatus};
