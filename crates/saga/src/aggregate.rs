//! Saga instance aggregate.

use common::AggregateId;
use domain::{Aggregate, Command};
use event_store::{EventId, Version};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::TransitionError;
use crate::events::{CompensationFailure, SagaEvent};
use crate::state::SagaState;

/// A transition requested by the runner on one saga stream.
#[derive(Debug, Clone)]
pub struct SagaCommand {
    pub saga_id: AggregateId,
    pub action: SagaAction,
}

/// What the runner wants to record.
#[derive(Debug, Clone)]
pub enum SagaAction {
    Start {
        saga_type: String,
        association_key: AggregateId,
        trigger_event_id: EventId,
        context: serde_json::Value,
    },
    BeginStep {
        step: usize,
        name: String,
    },
    CompleteStep {
        step: usize,
        name: String,
    },
    FailStep {
        step: usize,
        name: String,
        error: String,
    },
    StartCompensation {
        from_step: String,
    },
    RecordCompensated {
        step: usize,
        name: String,
    },
    RecordCompensationFailure {
        name: String,
        error: String,
    },
    Complete,
    Fail {
        reason: String,
        compensation_failures: Vec<CompensationFailure>,
    },
}

impl SagaCommand {
    pub fn new(saga_id: AggregateId, action: SagaAction) -> Self {
        Self { saga_id, action }
    }
}

impl Command for SagaCommand {
    fn aggregate_id(&self) -> AggregateId {
        self.saga_id
    }

    fn requires_existing(&self) -> bool {
        !matches!(self.action, SagaAction::Start { .. })
    }
}

/// An event-sourced saga instance.
///
/// Tracks the state of a saga execution: which steps completed, which were
/// undone, and what went wrong. The step inputs are kept with the start event
/// so the instance can be inspected without the trigger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SagaInstance {
    id: Option<AggregateId>,
    version: Version,
    saga_type: String,
    association_key: Option<AggregateId>,
    trigger_event_id: Option<EventId>,
    context: serde_json::Value,
    state: SagaState,
    completed_steps: Vec<String>,
    compensated_steps: Vec<String>,
    compensation_failures: Vec<CompensationFailure>,
    failed_step: Option<String>,
    /// Reason for failure, if any.
    failure_reason: Option<String>,
}

impl SagaInstance {
    fn ensure_running(&self, action: &'static str) -> Result<(), TransitionError> {
        if self.state.can_run_steps() {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    fn ensure_compensating(&self, action: &'static str) -> Result<(), TransitionError> {
        if self.state == SagaState::Compensating {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }
}

impl Aggregate for SagaInstance {
    type Command = SagaCommand;
    type Event = SagaEvent;
    type Error = TransitionError;

    fn aggregate_type() -> &'static str {
        "Saga"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn handle(&self, command: &SagaCommand) -> Result<SagaEvent, TransitionError> {
        match &command.action {
            SagaAction::Start {
                saga_type,
                association_key,
                trigger_event_id,
                context,
            } => {
                if self.state != SagaState::NotStarted {
                    return Err(TransitionError::AlreadyStarted);
                }
                Ok(SagaEvent::saga_started(
                    command.saga_id,
                    saga_type.clone(),
                    *association_key,
                    *trigger_event_id,
                    context.clone(),
                ))
            }
            SagaAction::BeginStep { step, name } => {
                self.ensure_running("begin a step")?;
                let expected = self.completed_steps.len();
                if *step != expected {
                    return Err(TransitionError::StepOutOfOrder {
                        expected,
                        requested: *step,
                    });
                }
                Ok(SagaEvent::step_started(*step, name.clone()))
            }
            SagaAction::CompleteStep { step, name } => {
                if self.state != (SagaState::StepPending { step: *step }) {
                    return Err(TransitionError::InvalidTransition {
                        action: "complete a step that is not pending",
                        state: self.state,
                    });
                }
                Ok(SagaEvent::step_completed(*step, name.clone()))
            }
            SagaAction::FailStep { step, name, error } => {
                if self.state != (SagaState::StepPending { step: *step }) {
                    return Err(TransitionError::InvalidTransition {
                        action: "fail a step that is not pending",
                        state: self.state,
                    });
                }
                Ok(SagaEvent::step_failed(*step, name.clone(), error.clone()))
            }
            SagaAction::StartCompensation { from_step } => {
                self.ensure_running("start compensation")?;
                Ok(SagaEvent::compensation_started(from_step.clone()))
            }
            SagaAction::RecordCompensated { step, name } => {
                self.ensure_compensating("record a compensation")?;
                Ok(SagaEvent::step_compensated(*step, name.clone()))
            }
            SagaAction::RecordCompensationFailure { name, error } => {
                self.ensure_compensating("record a compensation failure")?;
                Ok(SagaEvent::compensation_failed(name.clone(), error.clone()))
            }
            SagaAction::Complete => {
                self.ensure_running("complete")?;
                Ok(SagaEvent::saga_completed())
            }
            SagaAction::Fail {
                reason,
                compensation_failures,
            } => {
                if self.state == SagaState::NotStarted || self.state.is_terminal() {
                    return Err(TransitionError::InvalidTransition {
                        action: "fail",
                        state: self.state,
                    });
                }
                Ok(SagaEvent::saga_failed(
                    reason.clone(),
                    compensation_failures.clone(),
                ))
            }
        }
    }

    fn apply(&mut self, event: &SagaEvent) {
        match event {
            SagaEvent::SagaStarted(data) => {
                self.id = Some(data.saga_id);
                self.saga_type = data.saga_type.clone();
                self.association_key = Some(data.association_key);
                self.trigger_event_id = Some(data.trigger_event_id);
                self.context = data.context.clone();
                self.state = SagaState::Started;
            }
            SagaEvent::StepStarted(data) => {
                self.state = SagaState::StepPending { step: data.step };
            }
            SagaEvent::StepCompleted(data) => {
                self.completed_steps.push(data.step_name.clone());
                self.state = SagaState::StepPending {
                    step: data.step + 1,
                };
            }
            SagaEvent::StepFailed(data) => {
                self.failed_step = Some(data.step_name.clone());
                self.failure_reason = Some(data.error.clone());
            }
            SagaEvent::CompensationStarted(_) => {
                self.state = SagaState::Compensating;
            }
            SagaEvent::StepCompensated(data) => {
                self.compensated_steps.push(data.step_name.clone());
            }
            SagaEvent::CompensationFailed(failure) => {
                self.compensation_failures.push(failure.clone());
            }
            SagaEvent::SagaCompleted(_) => {
                self.state = SagaState::Succeeded;
            }
            SagaEvent::SagaFailed(data) => {
                self.state = SagaState::Failed;
                self.failure_reason = Some(data.reason.clone());
                // The report may also carry failures from the failure hook.
                self.compensation_failures = data.compensation_failures.clone();
            }
        }
    }
}

// Query methods
impl SagaInstance {
    /// Returns the saga state.
    pub fn state(&self) -> SagaState {
        self.state
    }

    /// Returns the saga type.
    pub fn saga_type(&self) -> &str {
        &self.saga_type
    }

    /// Returns the entity this saga runs for.
    pub fn association_key(&self) -> Option<AggregateId> {
        self.association_key
    }

    /// Returns the event that started this saga.
    pub fn trigger_event_id(&self) -> Option<EventId> {
        self.trigger_event_id
    }

    /// Decodes the step inputs recorded at start.
    pub fn context<C: DeserializeOwned>(&self) -> Result<C, serde_json::Error> {
        serde_json::from_value(self.context.clone())
    }

    /// Returns the completed step names in completion order.
    pub fn completed_steps(&self) -> &[String] {
        &self.completed_steps
    }

    /// Returns the compensated step names in compensation order.
    pub fn compensated_steps(&self) -> &[String] {
        &self.compensated_steps
    }

    pub fn compensation_failures(&self) -> &[CompensationFailure] {
        &self.compensation_failures
    }

    /// Returns the name of the step that failed, if any.
    pub fn failed_step(&self) -> Option<&str> {
        self.failed_step.as_deref()
    }

    /// Returns the failure reason, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}
