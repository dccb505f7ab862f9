//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::order::OrderError;
use crate::payment::PaymentError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The order aggregate rejected a command.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// The payment aggregate rejected a command.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// The command targets a stream that does not exist.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejection from the note aggregate in the command handler tests.
    #[cfg(test)]
    #[error("Note error: {0}")]
    Note(String),
}
