use thiserror::Error;

/// Main error type for the coordination engine
#[derive(Error, Debug)]
pub enum CoordError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Agent decision errors
    #[error("Agent {agent_id} failed to decide: {reason}")]
    AgentFailed { agent_id: String, reason: String },

    #[error("Agent {agent_id} timed out after {elapsed_ms}ms")]
    AgentTimeout { agent_id: String, elapsed_ms: u64 },

    #[error("Duplicate agent id in round: {0}")]
    DuplicateAgent(String),

    // Action execution errors
    #[error("Action {action_id} failed: {reason}")]
    ActionFailed { action_id: String, reason: String },

    #[error("Action {action_id} timed out after {elapsed_ms}ms")]
    ActionTimeout { action_id: String, elapsed_ms: u64 },

    #[error("Resource {token} unavailable (held by {holder})")]
    ResourceUnavailable { token: String, holder: String },

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for CoordError
pub type Result<T> = std::result::Result<T, CoordError>;

/// Failure of a single resolution strategy. Never fatal: the resolver
/// moves on to the next candidate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Not enough participants: {found} < 2")]
    NotEnoughParticipants { found: usize },

    #[error("Action {0} is not pending in this round")]
    UnknownAction(String),

    #[error("Strategy declined: {0}")]
    Declined(String),
}

/// Failure to claim an execution token
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("Token {token} already held by {holder}")]
    AlreadyHeld { token: String, holder: String },
}

impl From<AllocationError> for CoordError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::AlreadyHeld { token, holder } => {
                CoordError::ResourceUnavailable { token, holder }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_error_converts() {
        let err: CoordError = AllocationError::AlreadyHeld {
            token: "resource:r1".into(),
            holder: "alice".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Resource resource:r1 unavailable (held by alice)"
        );
    }
}
