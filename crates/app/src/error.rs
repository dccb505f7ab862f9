//! Node-level error type.

use std::time::Duration;

use common::AggregateId;
use domain::DomainError;
use saga::SagaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("saga error: {0}")]
    Saga(#[from] SagaError),

    /// The saga for `key` did not reach a terminal state in time.
    #[error("saga for {key} did not settle within {after:?}")]
    SettleTimeout { key: AggregateId, after: Duration },

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
