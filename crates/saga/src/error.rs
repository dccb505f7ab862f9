//! Saga error types.

use domain::DomainError;
use event_store::EventStoreError;
use thiserror::Error;

use crate::state::SagaState;

/// A saga event that does not fit the instance's current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The saga stream already has a `SagaStarted` event.
    #[error("Saga has already been started")]
    AlreadyStarted,

    /// The requested transition is not allowed from the current state.
    #[error("Cannot {action} while saga is {state}")]
    InvalidTransition {
        action: &'static str,
        state: SagaState,
    },

    /// Steps must begin in declaration order.
    #[error("Step {requested} started out of order, expected step {expected}")]
    StepOutOfOrder { expected: usize, requested: usize },
}

/// Failure reported by an external port adapter.
#[derive(Debug, Error)]
pub enum PortError {
    /// The adapter could not carry out the call.
    #[error("{port} unavailable: {reason}")]
    Unavailable { port: &'static str, reason: String },

    /// A request or reply could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PortError {
    pub fn unavailable(port: &'static str, reason: impl Into<String>) -> Self {
        PortError::Unavailable {
            port,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The saga instance rejected a transition.
    #[error("Saga transition error: {0}")]
    Transition(#[from] TransitionError),

    /// An external port failed.
    #[error("Port error: {0}")]
    Port(#[from] PortError),

    /// The event routed to a saga is not its trigger.
    #[error("{saga_type} cannot be triggered by {event_type}")]
    UnexpectedTrigger {
        saga_type: &'static str,
        event_type: String,
    },

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Event store error.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SagaError {
    /// Returns true if the error is an optimistic concurrency conflict on a
    /// saga stream.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SagaError::EventStore(e) if e.is_conflict())
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
