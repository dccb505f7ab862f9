//! Drives one saga definition: ordered steps, reverse compensation.

use std::time::Instant;

use common::AggregateId;
use domain::{Aggregate, DomainEvent};
use event_store::{AppendOptions, EventEnvelope, EventStore, Version};

use crate::aggregate::{SagaAction, SagaCommand, SagaInstance};
use crate::definition::SagaDefinition;
use crate::error::{Result, SagaError};
use crate::events::{CompensationFailure, SagaEvent};
use crate::registry::SagaRegistry;

/// What compensation achieved after a failed step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompensationReport {
    /// Steps undone, in the order they were undone.
    pub compensated: Vec<String>,
    /// Compensations, the failure hook and failure-path transitions that
    /// did not succeed.
    pub failures: Vec<CompensationFailure>,
}

impl CompensationReport {
    /// True when every completed step was undone and the hook succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// How a saga run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaOutcome {
    /// Every step succeeded.
    Succeeded { saga_id: AggregateId },

    /// A step failed and completed steps were compensated.
    Failed {
        saga_id: AggregateId,
        failed_step: String,
        reason: String,
        compensation_report: CompensationReport,
    },

    /// A saga for this key already ran or is running; nothing was executed.
    Duplicate { saga_id: AggregateId },
}

impl SagaOutcome {
    pub fn saga_id(&self) -> AggregateId {
        match self {
            SagaOutcome::Succeeded { saga_id }
            | SagaOutcome::Failed { saga_id, .. }
            | SagaOutcome::Duplicate { saga_id } => *saga_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SagaOutcome::Succeeded { .. })
    }
}

/// Executes a [`SagaDefinition`] and records its progress as saga events.
///
/// Each saga gets its own stream whose ID is derived from the association key
/// and the saga type. Writing `SagaStarted` with `expect_new` is what makes a
/// redelivered trigger a no-op, even across restarts. The in-process
/// [`SagaRegistry`] keeps concurrent triggers from racing to that write.
pub struct SagaRunner<S, D>
where
    S: EventStore,
    D: SagaDefinition,
{
    store: S,
    definition: D,
    registry: SagaRegistry,
}

impl<S, D> SagaRunner<S, D>
where
    S: EventStore,
    D: SagaDefinition,
{
    pub fn new(store: S, definition: D) -> Self {
        Self {
            store,
            definition,
            registry: SagaRegistry::new(),
        }
    }

    pub fn definition(&self) -> &D {
        &self.definition
    }

    pub fn registry(&self) -> &SagaRegistry {
        &self.registry
    }

    /// Stream ID of the saga for an association key.
    pub fn saga_id_for(&self, key: AggregateId) -> AggregateId {
        key.derive(self.definition.saga_type())
    }

    /// Runs the saga for a trigger event.
    ///
    /// Step failures are not errors: they end in [`SagaOutcome::Failed`].
    /// An `Err` means the saga's own bookkeeping failed (store or encoding).
    #[tracing::instrument(
        skip(self, trigger),
        fields(saga_type = self.definition.saga_type(), trigger = %trigger.event_id)
    )]
    pub async fn run(&self, trigger: &EventEnvelope) -> Result<SagaOutcome> {
        if trigger.event_type != self.definition.trigger_event_type() {
            return Err(SagaError::UnexpectedTrigger {
                saga_type: self.definition.saga_type(),
                event_type: trigger.event_type.clone(),
            });
        }

        let ctx = self.definition.context(trigger)?;
        let key = self.definition.association_key(&ctx);
        let saga_id = self.saga_id_for(key);

        let Some(_claim) = self.registry.claim(key, saga_id) else {
            return Ok(self.duplicate(saga_id, "saga already running for key"));
        };

        let mut saga = SagaInstance::default();
        let start = SagaAction::Start {
            saga_type: self.definition.saga_type().to_string(),
            association_key: key,
            trigger_event_id: trigger.event_id,
            context: serde_json::to_value(&ctx)?,
        };
        match self.record(&mut saga, saga_id, start).await {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                return Ok(self.duplicate(saga_id, "saga already recorded for key"));
            }
            Err(e) => return Err(e),
        }

        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = Instant::now();
        tracing::info!(%saga_id, %key, "saga started");

        let outcome = self.execute(&mut saga, saga_id, &ctx).await?;

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);
        match &outcome {
            SagaOutcome::Succeeded { .. } => {
                metrics::counter!("saga_completed").increment(1);
                tracing::info!(%saga_id, duration, "saga completed successfully");
            }
            SagaOutcome::Failed {
                failed_step,
                compensation_report,
                ..
            } => {
                metrics::counter!("saga_failed").increment(1);
                tracing::warn!(
                    %saga_id,
                    %failed_step,
                    compensated = compensation_report.compensated.len(),
                    compensation_failures = compensation_report.failures.len(),
                    "saga failed"
                );
            }
            SagaOutcome::Duplicate { .. } => {}
        }
        Ok(outcome)
    }

    async fn execute(
        &self,
        saga: &mut SagaInstance,
        saga_id: AggregateId,
        ctx: &D::Context,
    ) -> Result<SagaOutcome> {
        let steps = self.definition.steps();

        for (index, step) in steps.iter().enumerate() {
            let name = step.name();
            let begin = SagaAction::BeginStep {
                step: index,
                name: name.to_string(),
            };
            if let Err(e) = self.record(saga, saga_id, begin).await {
                tracing::error!(step = name, error = %e, "failed to record step start");
                let error = format!("step start not recorded: {e}");
                return self.abort(saga, saga_id, ctx, index, index, error).await;
            }
            tracing::info!(step = name, "saga step started");

            let error = match step.execute(ctx).await {
                Ok(true) => {
                    let complete = SagaAction::CompleteStep {
                        step: index,
                        name: name.to_string(),
                    };
                    match self.record(saga, saga_id, complete).await {
                        Ok(()) => continue,
                        Err(e) => {
                            // The step took effect, so it is undone with the others.
                            tracing::error!(
                                step = name,
                                error = %e,
                                "failed to record step completion"
                            );
                            let error = format!("step completion not recorded: {e}");
                            return self.abort(saga, saga_id, ctx, index, index + 1, error).await;
                        }
                    }
                }
                Ok(false) => "declined".to_string(),
                Err(e) => e.to_string(),
            };

            tracing::warn!(step = name, %error, "saga step failed");
            return self.abort(saga, saga_id, ctx, index, index, error).await;
        }

        self.record(saga, saga_id, SagaAction::Complete).await?;
        Ok(SagaOutcome::Succeeded { saga_id })
    }

    /// Marks step `failed` as failed, undoes the first `undo` steps and ends
    /// the saga.
    ///
    /// Store errors from here on are reported, never propagated, until the
    /// terminal `SagaFailed` append.
    async fn abort(
        &self,
        saga: &mut SagaInstance,
        saga_id: AggregateId,
        ctx: &D::Context,
        failed: usize,
        undo: usize,
        error: String,
    ) -> Result<SagaOutcome> {
        let name = self.definition.steps()[failed].name();
        let mut report = CompensationReport::default();

        let fail_step = SagaAction::FailStep {
            step: failed,
            name: name.to_string(),
            error: error.clone(),
        };
        self.record_or_report(saga, saga_id, fail_step, name, &mut report)
            .await;

        self.compensate(saga, saga_id, ctx, name, undo, &mut report)
            .await;

        let reason = format!("{name}: {error}");
        self.fail(saga, saga_id, ctx, name, reason, report).await
    }

    /// Undoes the first `undo` steps, last completed first. Each compensation
    /// is tried once; a failure is reported and the rest still run.
    async fn compensate(
        &self,
        saga: &mut SagaInstance,
        saga_id: AggregateId,
        ctx: &D::Context,
        from_step: &str,
        undo: usize,
        report: &mut CompensationReport,
    ) {
        let completed = &self.definition.steps()[..undo];
        if completed.is_empty() {
            return;
        }

        let start = SagaAction::StartCompensation {
            from_step: from_step.to_string(),
        };
        self.record_or_report(saga, saga_id, start, from_step, report)
            .await;

        for (index, step) in completed.iter().enumerate().rev() {
            let name = step.name();
            match step.compensate(ctx).await {
                Ok(()) => {
                    tracing::warn!(step = name, "saga step compensated");
                    report.compensated.push(name.to_string());
                    let compensated = SagaAction::RecordCompensated {
                        step: index,
                        name: name.to_string(),
                    };
                    self.record_or_report(saga, saga_id, compensated, name, report)
                        .await;
                }
                Err(e) => {
                    metrics::counter!("saga_compensation_failures_total").increment(1);
                    tracing::error!(step = name, error = %e, "saga compensation failed");
                    report.failures.push(CompensationFailure {
                        step_name: name.to_string(),
                        error: e.to_string(),
                    });
                    let failure = SagaAction::RecordCompensationFailure {
                        name: name.to_string(),
                        error: e.to_string(),
                    };
                    self.record_or_report(saga, saga_id, failure, name, report)
                        .await;
                }
            }
        }
    }

    /// Records a transition on the failure path. A store error is logged and
    /// added to the report so the remaining compensations still run.
    async fn record_or_report(
        &self,
        saga: &mut SagaInstance,
        saga_id: AggregateId,
        action: SagaAction,
        step_name: &str,
        report: &mut CompensationReport,
    ) {
        if let Err(e) = self.record(saga, saga_id, action).await {
            metrics::counter!("saga_record_failures_total").increment(1);
            tracing::error!(
                %saga_id,
                step = step_name,
                error = %e,
                "failed to record saga transition"
            );
            report.failures.push(CompensationFailure {
                step_name: step_name.to_string(),
                error: format!("not recorded: {e}"),
            });
        }
    }

    async fn fail(
        &self,
        saga: &mut SagaInstance,
        saga_id: AggregateId,
        ctx: &D::Context,
        failed_step: &str,
        reason: String,
        mut report: CompensationReport,
    ) -> Result<SagaOutcome> {
        if let Err(e) = self.definition.on_failed(ctx, &reason).await {
            metrics::counter!("saga_compensation_failures_total").increment(1);
            tracing::error!(error = %e, "saga failure hook failed");
            report.failures.push(CompensationFailure {
                step_name: "on_failed".to_string(),
                error: e.to_string(),
            });
        }

        self.record(
            saga,
            saga_id,
            SagaAction::Fail {
                reason: reason.clone(),
                compensation_failures: report.failures.clone(),
            },
        )
        .await?;

        Ok(SagaOutcome::Failed {
            saga_id,
            failed_step: failed_step.to_string(),
            reason,
            compensation_report: report,
        })
    }

    fn duplicate(&self, saga_id: AggregateId, why: &'static str) -> SagaOutcome {
        metrics::counter!("saga_duplicates_total").increment(1);
        tracing::info!(%saga_id, why, "duplicate saga trigger ignored");
        SagaOutcome::Duplicate { saga_id }
    }

    /// Validates a transition, persists its event, then folds it in.
    async fn record(
        &self,
        saga: &mut SagaInstance,
        saga_id: AggregateId,
        action: SagaAction,
    ) -> Result<()> {
        let caused_by = match &action {
            SagaAction::Start {
                trigger_event_id, ..
            } => Some(*trigger_event_id),
            _ => saga.trigger_event_id(),
        };
        let command = SagaCommand::new(saga_id, action);
        let event = saga.handle(&command)?;
        let current_version = saga.version();

        let mut builder = EventEnvelope::builder()
            .event_type(event.event_type())
            .aggregate_id(saga_id)
            .aggregate_type(SagaInstance::aggregate_type())
            .version(current_version.next())
            .payload(&event)?;
        if let Some(trigger_id) = caused_by {
            builder = builder.causation_id(trigger_id);
        }
        let envelope = builder.build()?;

        let options = if current_version == Version::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_version(current_version)
        };
        let new_version = self.store.append(vec![envelope], options).await?;

        saga.apply(&event);
        saga.set_version(new_version);
        Ok(())
    }

    /// Loads a saga instance by ID from the event store.
    pub async fn get_saga(&self, saga_id: AggregateId) -> Result<Option<SagaInstance>> {
        let events = self.store.get_events_for_aggregate(saga_id).await?;

        if events.is_empty() {
            return Ok(None);
        }

        let mut saga = SagaInstance::default();
        for envelope in events {
            let event: SagaEvent = envelope.decode()?;
            saga.apply(&event);
            saga.set_version(envelope.version);
        }
        Ok(Some(saga))
    }

    /// Loads the saga that ran (or is running) for an association key.
    pub async fn find_by_association(&self, key: AggregateId) -> Result<Option<SagaInstance>> {
        self.get_saga(self.saga_id_for(key)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use event_store::{EventStoreError, EventStream, EventSubscription, InMemoryEventStore};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::definition::SagaStep;
    use crate::error::PortError;
    use crate::state::SagaState;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Ctx {
        key: AggregateId,
    }

    type Log = Arc<Mutex<Vec<String>>>;

    struct Scripted {
        name: &'static str,
        succeed: bool,
        fail_compensation: bool,
        log: Log,
    }

    #[async_trait]
    impl SagaStep<Ctx> for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn execute(&self, _ctx: &Ctx) -> Result<bool> {
            self.log.lock().unwrap().push(format!("{}.execute", self.name));
            Ok(self.succeed)
        }

        async fn compensate(&self, _ctx: &Ctx) -> Result<()> {
            self.log.lock().unwrap().push(format!("{}.compensate", self.name));
            if self.fail_compensation {
                return Err(PortError::unavailable("scripted", "down").into());
            }
            Ok(())
        }
    }

    struct Plan {
        steps: Vec<Box<dyn SagaStep<Ctx>>>,
    }

    impl Plan {
        /// `steps` is (name, succeeds, compensation fails) per step.
        fn new(steps: &[(&'static str, bool, bool)], log: &Log) -> Self {
            let steps = steps
                .iter()
                .map(|&(name, succeed, fail_compensation)| {
                    Box::new(Scripted {
                        name,
                        succeed,
                        fail_compensation,
                        log: Arc::clone(log),
                    }) as Box<dyn SagaStep<Ctx>>
                })
                .collect();
            Self { steps }
        }
    }

    #[async_trait]
    impl SagaDefinition for Plan {
        type Context = Ctx;

        fn saga_type(&self) -> &'static str {
            "TestSaga"
        }

        fn trigger_event_type(&self) -> &'static str {
            "Triggered"
        }

        fn context(&self, trigger: &EventEnvelope) -> Result<Ctx> {
            Ok(Ctx {
                key: trigger.aggregate_id,
            })
        }

        fn association_key(&self, ctx: &Ctx) -> AggregateId {
            ctx.key
        }

        fn steps(&self) -> &[Box<dyn SagaStep<Ctx>>] {
            &self.steps
        }
    }

    fn trigger(key: AggregateId) -> EventEnvelope {
        EventEnvelope::builder()
            .event_type("Triggered")
            .aggregate_id(key)
            .aggregate_type("Test")
            .version(Version::first())
            .payload_raw(serde_json::Value::Null)
            .build()
            .unwrap()
    }

    fn runner(steps: &[(&'static str, bool, bool)]) -> (SagaRunner<InMemoryEventStore, Plan>, Log) {
        let log = Log::default();
        let runner = SagaRunner::new(InMemoryEventStore::new(), Plan::new(steps, &log));
        (runner, log)
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    /// Store that rejects the first append containing `fail_on`.
    struct FailOnceStore {
        inner: InMemoryEventStore,
        fail_on: &'static str,
        tripped: AtomicBool,
    }

    impl FailOnceStore {
        fn new(fail_on: &'static str) -> Self {
            Self {
                inner: InMemoryEventStore::new(),
                fail_on,
                tripped: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl EventStore for FailOnceStore {
        async fn append(
            &self,
            events: Vec<EventEnvelope>,
            options: AppendOptions,
        ) -> event_store::Result<Version> {
            let hit = events.iter().any(|e| e.event_type == self.fail_on);
            if hit && !self.tripped.swap(true, Ordering::SeqCst) {
                return Err(EventStoreError::InvalidAppend(format!(
                    "{} write refused",
                    self.fail_on
                )));
            }
            self.inner.append(events, options).await
        }

        async fn get_events_for_aggregate(
            &self,
            aggregate_id: AggregateId,
        ) -> event_store::Result<Vec<EventEnvelope>> {
            self.inner.get_events_for_aggregate(aggregate_id).await
        }

        async fn get_events_by_type(
            &self,
            event_type: &str,
        ) -> event_store::Result<Vec<EventEnvelope>> {
            self.inner.get_events_by_type(event_type).await
        }

        async fn stream_all_events(&self) -> event_store::Result<EventStream> {
            self.inner.stream_all_events().await
        }

        async fn get_aggregate_version(
            &self,
            aggregate_id: AggregateId,
        ) -> event_store::Result<Option<Version>> {
            self.inner.get_aggregate_version(aggregate_id).await
        }

        fn subscribe(&self) -> EventSubscription {
            self.inner.subscribe()
        }
    }

    fn runner_failing_on(
        fail_on: &'static str,
        steps: &[(&'static str, bool, bool)],
    ) -> (SagaRunner<FailOnceStore, Plan>, Log) {
        let log = Log::default();
        let runner = SagaRunner::new(FailOnceStore::new(fail_on), Plan::new(steps, &log));
        (runner, log)
    }

    #[tokio::test]
    async fn all_steps_succeed() {
        let (runner, log) = runner(&[("s1", true, false), ("s2", true, false), ("s3", true, false)]);
        let key = AggregateId::new();

        let outcome = runner.run(&trigger(key)).await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(entries(&log), vec!["s1.execute", "s2.execute", "s3.execute"]);
        let saga = runner.find_by_association(key).await.unwrap().unwrap();
        assert_eq!(saga.state(), SagaState::Succeeded);
        assert_eq!(saga.completed_steps(), &["s1", "s2", "s3"]);
        assert_eq!(runner.registry().active_count(), 0);
    }

    #[tokio::test]
    async fn second_step_failure_compensates_first_and_skips_third() {
        let (runner, log) = runner(&[("s1", true, false), ("s2", false, false), ("s3", true, false)]);
        let key = AggregateId::new();

        let outcome = runner.run(&trigger(key)).await.unwrap();

        assert_eq!(entries(&log), vec!["s1.execute", "s2.execute", "s1.compensate"]);
        let SagaOutcome::Failed {
            failed_step,
            compensation_report,
            ..
        } = outcome
        else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(failed_step, "s2");
        assert_eq!(compensation_report.compensated, vec!["s1"]);
        assert!(compensation_report.is_clean());
    }

    #[tokio::test]
    async fn third_step_failure_compensates_in_reverse() {
        let (runner, log) = runner(&[("s1", true, false), ("s2", true, false), ("s3", false, false)]);
        let key = AggregateId::new();

        runner.run(&trigger(key)).await.unwrap();

        assert_eq!(
            entries(&log),
            vec![
                "s1.execute",
                "s2.execute",
                "s3.execute",
                "s2.compensate",
                "s1.compensate"
            ]
        );
        let saga = runner.find_by_association(key).await.unwrap().unwrap();
        assert_eq!(saga.state(), SagaState::Failed);
        assert_eq!(saga.compensated_steps(), &["s2", "s1"]);
        assert_eq!(saga.failed_step(), Some("s3"));
    }

    #[tokio::test]
    async fn first_step_failure_compensates_nothing() {
        let (runner, log) = runner(&[("s1", false, false), ("s2", true, false)]);
        let key = AggregateId::new();

        runner.run(&trigger(key)).await.unwrap();

        assert_eq!(entries(&log), vec!["s1.execute"]);
        let events = runner
            .store
            .get_events_for_aggregate(runner.saga_id_for(key))
            .await
            .unwrap();
        let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["SagaStarted", "StepStarted", "StepFailed", "SagaFailed"]
        );
    }

    #[tokio::test]
    async fn failed_compensation_does_not_stop_the_others() {
        let (runner, log) = runner(&[("s1", true, false), ("s2", true, true), ("s3", false, false)]);
        let key = AggregateId::new();

        let outcome = runner.run(&trigger(key)).await.unwrap();

        assert_eq!(
            entries(&log),
            vec![
                "s1.execute",
                "s2.execute",
                "s3.execute",
                "s2.compensate",
                "s1.compensate"
            ]
        );
        let SagaOutcome::Failed {
            compensation_report,
            ..
        } = outcome
        else {
            panic!("expected failure");
        };
        assert_eq!(compensation_report.compensated, vec!["s1"]);
        assert_eq!(compensation_report.failures.len(), 1);
        assert_eq!(compensation_report.failures[0].step_name, "s2");

        let saga = runner.find_by_association(key).await.unwrap().unwrap();
        assert_eq!(saga.compensation_failures().len(), 1);
    }

    #[tokio::test]
    async fn redelivered_trigger_is_a_duplicate() {
        let (runner, log) = runner(&[("s1", true, false)]);
        let key = AggregateId::new();
        let event = trigger(key);

        let first = runner.run(&event).await.unwrap();
        let second = runner.run(&event).await.unwrap();

        assert!(first.is_success());
        assert_eq!(
            second,
            SagaOutcome::Duplicate {
                saga_id: runner.saga_id_for(key)
            }
        );
        assert_eq!(entries(&log), vec!["s1.execute"]);
    }

    #[tokio::test]
    async fn wrong_trigger_type_is_rejected() {
        let (runner, _) = runner(&[("s1", true, false)]);
        let mut event = trigger(AggregateId::new());
        event.event_type = "SomethingElse".to_string();

        let result = runner.run(&event).await;
        assert!(matches!(result, Err(SagaError::UnexpectedTrigger { .. })));
    }

    #[tokio::test]
    async fn unrecorded_compensation_still_undoes_earlier_steps() {
        let (runner, log) = runner_failing_on(
            "StepCompensated",
            &[("s1", true, false), ("s2", true, false), ("s3", false, false)],
        );
        let key = AggregateId::new();

        let outcome = runner.run(&trigger(key)).await.unwrap();

        assert_eq!(
            entries(&log),
            vec![
                "s1.execute",
                "s2.execute",
                "s3.execute",
                "s2.compensate",
                "s1.compensate"
            ]
        );
        let SagaOutcome::Failed {
            failed_step,
            compensation_report,
            ..
        } = outcome
        else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(failed_step, "s3");
        assert_eq!(compensation_report.compensated, vec!["s2", "s1"]);
        assert_eq!(compensation_report.failures.len(), 1);
        assert_eq!(compensation_report.failures[0].step_name, "s2");
        assert!(compensation_report.failures[0].error.starts_with("not recorded"));

        let saga = runner.find_by_association(key).await.unwrap().unwrap();
        assert_eq!(saga.state(), SagaState::Failed);
        assert_eq!(saga.compensated_steps(), &["s1"]);
        assert_eq!(runner.registry().active_count(), 0);
    }

    #[tokio::test]
    async fn unrecorded_step_completion_is_treated_as_a_failure() {
        let (runner, log) =
            runner_failing_on("StepCompleted", &[("s1", true, false), ("s2", true, false)]);
        let key = AggregateId::new();

        let outcome = runner.run(&trigger(key)).await.unwrap();

        assert_eq!(entries(&log), vec!["s1.execute", "s1.compensate"]);
        let SagaOutcome::Failed {
            failed_step,
            compensation_report,
            ..
        } = outcome
        else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(failed_step, "s1");
        assert_eq!(compensation_report.compensated, vec!["s1"]);

        let saga = runner.find_by_association(key).await.unwrap().unwrap();
        assert_eq!(saga.state(), SagaState::Failed);
        assert_eq!(saga.failed_step(), Some("s1"));
        assert_eq!(saga.compensated_steps(), &["s1"]);
        assert!(saga.completed_steps().is_empty());
    }
}
