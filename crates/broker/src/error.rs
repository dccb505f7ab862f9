use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to the message broker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The broker refused or failed to accept a message.
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed { topic: String, reason: String },

    /// Topic name is empty or otherwise unusable.
    #[error("Invalid topic: {0:?}")]
    InvalidTopic(String),
}

/// Errors returned by [`CorrelationClient::send_and_await`](crate::CorrelationClient::send_and_await).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// Another request with the same key is still waiting for its reply.
    #[error("A request with correlation key {0} is already pending")]
    DuplicatePending(String),

    /// The request could not be published.
    #[error(transparent)]
    Publish(#[from] BrokerError),

    /// No reply arrived in time.
    #[error("No reply for correlation key {key} after {after:?}")]
    Timeout { key: String, after: Duration },

    /// The pending request was dropped before a reply arrived.
    #[error("Request with correlation key {0} was cancelled")]
    Cancelled(String),
}

impl CorrelationError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CorrelationError::Timeout { .. })
    }
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
