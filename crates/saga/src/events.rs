//! Saga domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::DomainEvent;
use event_store::EventId;
use serde::{Deserialize, Serialize};

/// Events that can occur during saga execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaEvent {
    /// Saga execution started.
    SagaStarted(SagaStartedData),

    /// A saga step started execution.
    StepStarted(StepData),

    /// A saga step completed successfully.
    StepCompleted(StepData),

    /// A saga step failed.
    StepFailed(StepFailedData),

    /// Compensation started after a step failure.
    CompensationStarted(CompensationStartedData),

    /// A completed step was undone.
    StepCompensated(StepData),

    /// Undoing a completed step failed; the remaining compensations still run.
    CompensationFailed(CompensationFailure),

    /// Saga completed successfully.
    SagaCompleted(SagaCompletedData),

    /// Saga failed after compensation.
    SagaFailed(SagaFailedData),
}

impl DomainEvent for SagaEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SagaEvent::SagaStarted(_) => "SagaStarted",
            SagaEvent::StepStarted(_) => "StepStarted",
            SagaEvent::StepCompleted(_) => "StepCompleted",
            SagaEvent::StepFailed(_) => "StepFailed",
            SagaEvent::CompensationStarted(_) => "CompensationStarted",
            SagaEvent::StepCompensated(_) => "StepCompensated",
            SagaEvent::CompensationFailed(_) => "CompensationFailed",
            SagaEvent::SagaCompleted(_) => "SagaCompleted",
            SagaEvent::SagaFailed(_) => "SagaFailed",
        }
    }
}

/// Data for SagaStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaStartedData {
    /// The saga instance ID.
    pub saga_id: AggregateId,
    /// The type of saga (e.g., "OrderSaga").
    pub saga_type: String,
    /// The entity this saga runs for.
    pub association_key: AggregateId,
    /// The event that triggered the saga.
    pub trigger_event_id: EventId,
    /// Step inputs taken from the trigger.
    pub context: serde_json::Value,
    /// When the saga started.
    pub started_at: DateTime<Utc>,
}

/// Identifies one step of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepData {
    /// Zero-based position in the plan.
    pub step: usize,
    /// The step name.
    pub step_name: String,
}

/// Data for StepFailed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailedData {
    pub step: usize,
    pub step_name: String,
    /// Why the step failed.
    pub error: String,
}

/// Data for CompensationStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationStartedData {
    /// The step whose failure triggered compensation.
    pub from_step: String,
}

/// A compensation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationFailure {
    pub step_name: String,
    pub error: String,
}

/// Data for SagaCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaCompletedData {
    /// When the saga completed.
    pub completed_at: DateTime<Utc>,
}

/// Data for SagaFailed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaFailedData {
    /// Reason for failure.
    pub reason: String,
    /// Compensations that could not be carried out.
    #[serde(default)]
    pub compensation_failures: Vec<CompensationFailure>,
    /// When the saga failed.
    pub failed_at: DateTime<Utc>,
}

// Convenience constructors
impl SagaEvent {
    /// Creates a SagaStarted event.
    pub fn saga_started(
        saga_id: AggregateId,
        saga_type: impl Into<String>,
        association_key: AggregateId,
        trigger_event_id: EventId,
        context: serde_json::Value,
    ) -> Self {
        SagaEvent::SagaStarted(SagaStartedData {
            saga_id,
            saga_type: saga_type.into(),
            association_key,
            trigger_event_id,
            context,
            started_at: Utc::now(),
        })
    }

    /// Creates a StepStarted event.
    pub fn step_started(step: usize, step_name: impl Into<String>) -> Self {
        SagaEvent::StepStarted(StepData {
            step,
            step_name: step_name.into(),
        })
    }

    /// Creates a StepCompleted event.
    pub fn step_completed(step: usize, step_name: impl Into<String>) -> Self {
        SagaEvent::StepCompleted(StepData {
            step,
            step_name: step_name.into(),
        })
    }

    /// Creates a StepFailed event.
    pub fn step_failed(step: usize, step_name: impl Into<String>, error: impl Into<String>) -> Self {
        SagaEvent::StepFailed(StepFailedData {
            step,
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    /// Creates a CompensationStarted event.
    pub fn compensation_started(from_step: impl Into<String>) -> Self {
        SagaEvent::CompensationStarted(CompensationStartedData {
            from_step: from_step.into(),
        })
    }

    /// Creates a StepCompensated event.
    pub fn step_compensated(step: usize, step_name: impl Into<String>) -> Self {
        SagaEvent::StepCompensated(StepData {
            step,
            step_name: step_name.into(),
        })
    }

    /// Creates a CompensationFailed event.
    pub fn compensation_failed(step_name: impl Into<String>, error: impl Into<String>) -> Self {
        SagaEvent::CompensationFailed(CompensationFailure {
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    /// Creates a SagaCompleted event.
    pub fn saga_completed() -> Self {
        SagaEvent::SagaCompleted(SagaCompletedData {
            completed_at: Utc::now(),
        })
    }

    /// Creates a SagaFailed event.
    pub fn saga_failed(
        reason: impl Into<String>,
        compensation_failures: Vec<CompensationFailure>,
    ) -> Self {
        SagaEvent::SagaFailed(SagaFailedData {
            reason: reason.into(),
            compensation_failures,
            failed_at: Utc::now(),
        })
    }
}
