//! Payment saga: settle a foreign-currency payment, cancel the payment if
//! settlement fails.

use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use domain::{CancelPayment, Money, PaymentEvent, PaymentService};
use event_store::{EventEnvelope, EventStore};
use serde::{Deserialize, Serialize};

use crate::definition::{SagaDefinition, SagaStep};
use crate::error::{Result, SagaError};
use crate::ports::ForeignPaymentPort;

/// The saga type identifier for payments.
pub const SAGA_TYPE: &str = "PaymentSaga";

/// Step name: settle the payment in its currency.
pub const STEP_CHARGE_FOREIGN: &str = "charge_foreign";

/// Reason recorded on the payment when settlement fails.
pub const FOREIGN_FAILURE_REASON: &str = "Foreign payment failed";

/// Inputs for the payment saga, copied from `PaymentCreated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSagaContext {
    pub payment_id: AggregateId,
    pub amount: Money,
    pub currency: String,
}

struct ChargeForeign {
    foreign: Arc<dyn ForeignPaymentPort>,
}

#[async_trait]
impl SagaStep<PaymentSagaContext> for ChargeForeign {
    fn name(&self) -> &'static str {
        STEP_CHARGE_FOREIGN
    }

    async fn execute(&self, ctx: &PaymentSagaContext) -> Result<bool> {
        Ok(self
            .foreign
            .charge(ctx.payment_id, ctx.amount, &ctx.currency)
            .await?)
    }
}

/// Runs after every `PaymentCreated`, keyed by payment ID.
///
/// A failed settlement is undone by sending `CancelPayment` to the payment
/// aggregate, which records a `PaymentCancelled` event.
pub struct PaymentSaga<S: EventStore> {
    steps: Vec<Box<dyn SagaStep<PaymentSagaContext>>>,
    payments: PaymentService<S>,
}

impl<S: EventStore> PaymentSaga<S> {
    pub fn new(store: S, foreign: Arc<dyn ForeignPaymentPort>) -> Self {
        Self {
            steps: vec![Box::new(ChargeForeign { foreign })],
            payments: PaymentService::new(store),
        }
    }
}

#[async_trait]
impl<S: EventStore + 'static> SagaDefinition for PaymentSaga<S> {
    type Context = PaymentSagaContext;

    fn saga_type(&self) -> &'static str {
        SAGA_TYPE
    }

    fn trigger_event_type(&self) -> &'static str {
        "PaymentCreated"
    }

    fn context(&self, trigger: &EventEnvelope) -> Result<PaymentSagaContext> {
        match trigger.decode::<PaymentEvent>()? {
            PaymentEvent::PaymentCreated(data) => Ok(PaymentSagaContext {
                payment_id: data.payment_id,
                amount: data.amount,
                currency: data.currency,
            }),
            PaymentEvent::PaymentCancelled(_) => Err(SagaError::UnexpectedTrigger {
                saga_type: SAGA_TYPE,
                event_type: trigger.event_type.clone(),
            }),
        }
    }

    fn association_key(&self, ctx: &PaymentSagaContext) -> AggregateId {
        ctx.payment_id
    }

    fn steps(&self) -> &[Box<dyn SagaStep<PaymentSagaContext>>] {
        &self.steps
    }

    async fn on_failed(&self, ctx: &PaymentSagaContext, reason: &str) -> Result<()> {
        tracing::warn!(payment_id = %ctx.payment_id, reason, "cancelling payment after failed settlement");
        self.payments
            .cancel_payment(CancelPayment::new(ctx.payment_id, FOREIGN_FAILURE_REASON))
            .await?;
        Ok(())
    }
}
