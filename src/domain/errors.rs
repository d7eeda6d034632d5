//! Domain errors for the chain reactor.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use super::models::AgentStatus;

/// Errors raised while spawning, executing, or synthesizing agents.
///
/// Resource ceilings and validation failures are ordinary values here, so
/// the propagator is forced to handle "stop spawning" explicitly instead of
/// unwinding through the tree.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReactorError {
    #[error("Resource exhausted: {spawned} of {max} agents already spawned")]
    ResourceExhausted { spawned: usize, max: usize },

    #[error("Depth ceiling reached: depth {depth} exceeds max depth {max}")]
    DepthExceeded { depth: usize, max: usize },

    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("Invalid output: {}", .0.join("; "))]
    InvalidOutput(Vec<String>),

    #[error("Circuit breaker open, retry after {retry_after:?}")]
    CircuitOpen { retry_after: Duration },

    #[error("Propagation of agent {agent_id} timed out after {after:?}")]
    Timeout { agent_id: Uuid, after: Duration },

    #[error("Agent {agent_id} cancelled by ancestor {ancestor} timeout")]
    AncestorTimedOut { agent_id: Uuid, ancestor: Uuid },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("No role available for subtask '{0}'")]
    NoRoleAvailable(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: AgentStatus, to: AgentStatus },

    #[error("Output already set for agent {0}")]
    OutputAlreadySet(Uuid),
}

impl ReactorError {
    /// Whether the recovery manager may retry the failed call.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ExecutionFailed(_) | Self::InvalidOutput(_))
    }

    /// Whether the failure counts against the circuit breaker.
    ///
    /// Ceilings and precondition rejections are deterministic refusals, not
    /// faults of the guarded operation.
    pub const fn trips_breaker(&self) -> bool {
        matches!(
            self,
            Self::ExecutionFailed(_) | Self::InvalidOutput(_) | Self::Timeout { .. }
        )
    }

    /// Short machine-readable name of the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ResourceExhausted { .. } => "resource_exhausted",
            Self::DepthExceeded { .. } => "depth_exceeded",
            Self::ValidationFailed(_) => "validation_failed",
            Self::InvalidOutput(_) => "invalid_output",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Timeout { .. } | Self::AncestorTimedOut { .. } => "timeout",
            Self::ExecutionFailed(_) => "execution_failed",
            Self::NoRoleAvailable(_) => "no_role_available",
            Self::AgentNotFound(_) => "agent_not_found",
            Self::InvalidStateTransition { .. } => "invalid_state_transition",
            Self::OutputAlreadySet(_) => "output_already_set",
        }
    }
}

/// Result alias used across the reactor.
pub type ReactorResult<T> = Result<T, ReactorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(ReactorError::ExecutionFailed("boom".into()).is_retryable());
        assert!(ReactorError::InvalidOutput(vec!["null".into()]).is_retryable());
        assert!(!ReactorError::ResourceExhausted { spawned: 1, max: 1 }.is_retryable());
        assert!(!ReactorError::ValidationFailed(vec![]).is_retryable());
        assert!(!ReactorError::Timeout {
            agent_id: Uuid::nil(),
            after: Duration::from_secs(1)
        }
        .is_retryable());
    }

    #[test]
    fn test_breaker_classification() {
        assert!(ReactorError::ExecutionFailed("boom".into()).trips_breaker());
        assert!(!ReactorError::ResourceExhausted { spawned: 1, max: 1 }.trips_breaker());
        assert!(!ReactorError::NoRoleAvailable("docs".into()).trips_breaker());
    }

    #[test]
    fn test_display_joins_messages() {
        let err = ReactorError::ValidationFailed(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Validation failed: a; b");
        assert_eq!(err.kind(), "validation_failed");
    }

    #[test]
    fn test_cancelled_descendant_names_itself() {
        let agent_id = Uuid::new_v4();
        let ancestor = Uuid::new_v4();
        let err = ReactorError::AncestorTimedOut { agent_id, ancestor };

        assert_eq!(
            err.to_string(),
            format!("Agent {agent_id} cancelled by ancestor {ancestor} timeout")
        );
        assert_eq!(err.kind(), "timeout");
        assert!(!err.is_retryable());
        assert!(!err.trips_breaker());
    }
}
