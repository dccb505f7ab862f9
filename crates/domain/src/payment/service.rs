//! Payment service providing a simplified API for payment operations.

use common::AggregateId;
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::Money;

use super::{CancelPayment, CreatePayment, Payment};

/// Service for managing payments.
pub struct PaymentService<S: EventStore> {
    handler: CommandHandler<S, Payment>,
}

impl<S: EventStore> PaymentService<S> {
    /// Creates a new payment service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Creates a new payment.
    #[tracing::instrument(skip(self), fields(payment_id = %cmd.payment_id))]
    pub async fn create_payment(
        &self,
        cmd: CreatePayment,
    ) -> Result<CommandResult<Payment>, DomainError> {
        let result = self.handler.execute(cmd.into()).await;
        if result.is_ok() {
            metrics::counter!("payments_created_total").increment(1);
            tracing::info!("payment created");
        }
        result
    }

    /// Builds and executes a [`CreatePayment`] from its fields.
    pub async fn request_payment(
        &self,
        user_id: impl Into<String>,
        amount: Money,
        currency: impl Into<String>,
    ) -> Result<CommandResult<Payment>, DomainError> {
        self.create_payment(CreatePayment::new(user_id, amount, currency))
            .await
    }

    /// Cancels a payment.
    #[tracing::instrument(skip(self), fields(payment_id = %cmd.payment_id))]
    pub async fn cancel_payment(
        &self,
        cmd: CancelPayment,
    ) -> Result<CommandResult<Payment>, DomainError> {
        let result = self.handler.execute(cmd.into()).await;
        if result.is_ok() {
            metrics::counter!("payments_cancelled_total").increment(1);
            tracing::info!("payment cancelled");
        }
        result
    }

    /// Loads a payment by ID.
    ///
    /// Returns None if the payment doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_payment(
        &self,
        payment_id: AggregateId,
    ) -> Result<Option<Payment>, DomainError> {
        self.handler.load_existing(payment_id).await
    }
}
