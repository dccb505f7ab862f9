//! The pieces a saga is declared from.

use async_trait::async_trait;
use common::AggregateId;
use event_store::EventEnvelope;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;

/// One forward action of a saga, with the action that undoes it.
///
/// `execute` returning `Ok(false)` and returning `Err` are both treated as
/// a failed step.
#[async_trait]
pub trait SagaStep<C: Send + Sync>: Send + Sync {
    /// Stable step name, recorded in saga events.
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &C) -> Result<bool>;

    /// Undoes a completed `execute`. Called at most once per saga run, and
    /// only after a later step failed.
    ///
    /// Steps with nothing to undo keep the default.
    async fn compensate(&self, _ctx: &C) -> Result<()> {
        Ok(())
    }
}

/// A named, ordered plan triggered by one event type.
#[async_trait]
pub trait SagaDefinition: Send + Sync + 'static {
    /// Step inputs, taken from the trigger and stored with `SagaStarted`.
    type Context: Serialize + DeserializeOwned + Send + Sync + 'static;

    fn saga_type(&self) -> &'static str;

    /// Event type that starts this saga.
    fn trigger_event_type(&self) -> &'static str;

    /// Builds the step inputs from a trigger event.
    fn context(&self, trigger: &EventEnvelope) -> Result<Self::Context>;

    /// Identifies the entity the saga runs for. At most one instance runs
    /// per key.
    fn association_key(&self, ctx: &Self::Context) -> AggregateId;

    /// Steps in execution order.
    fn steps(&self) -> &[Box<dyn SagaStep<Self::Context>>];

    /// Runs once after a failed saga has finished compensating.
    async fn on_failed(&self, _ctx: &Self::Context, _reason: &str) -> Result<()> {
        Ok(())
    }
}
