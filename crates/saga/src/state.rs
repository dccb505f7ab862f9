//! Saga state machine.

use serde::{Deserialize, Serialize};

/// The state of a saga in its lifecycle.
///
/// State transitions:
/// ```text
/// NotStarted ──► Started ──► StepPending{0} ──► … ──► StepPending{n} ──► Succeeded
///                                 │                        │
///                                 └──► Failed              └──► Compensating ──► Failed
/// ```
///
/// A failure on the first step goes straight to `Failed` because nothing has
/// been completed that would need undoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    /// Saga has not started yet.
    #[default]
    NotStarted,

    /// The trigger has been recorded, no step has begun.
    Started,

    /// The step at this index is running or is the next to run.
    StepPending { step: usize },

    /// A step failed and completed steps are being undone.
    Compensating,

    /// All steps completed successfully (terminal state).
    Succeeded,

    /// The saga stopped after a failed step (terminal state).
    Failed,
}

impl SagaState {
    /// Returns true if a step may begin from this state.
    pub fn can_run_steps(&self) -> bool {
        matches!(self, SagaState::Started | SagaState::StepPending { .. })
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Succeeded | SagaState::Failed)
    }

    /// Returns the state name without its step index.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::NotStarted => "NotStarted",
            SagaState::Started => "Started",
            SagaState::StepPending { .. } => "StepPending",
            SagaState::Compensating => "Compensating",
            SagaState::Succeeded => "Succeeded",
            SagaState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SagaState::StepPending { step } => write!(f, "StepPending({step})"),
            other => f.write_str(other.as_str()),
        }
    }
}
