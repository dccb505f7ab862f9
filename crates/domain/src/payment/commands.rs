//! Payment commands.

use common::AggregateId;

use crate::command::Command;
use crate::Money;

/// Command to create a new payment.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    /// Generated when the command is built.
    pub payment_id: AggregateId,
    pub user_id: String,
    pub amount: Money,
    pub currency: String,
}

impl CreatePayment {
    /// Creates a new CreatePayment command with a fresh payment ID.
    pub fn new(user_id: impl Into<String>, amount: Money, currency: impl Into<String>) -> Self {
        Self {
            payment_id: AggregateId::new(),
            user_id: user_id.into(),
            amount,
            currency: currency.into(),
        }
    }
}

/// Command to cancel an existing payment.
#[derive(Debug, Clone)]
pub struct CancelPayment {
    pub payment_id: AggregateId,
    pub reason: String,
}

impl CancelPayment {
    pub fn new(payment_id: AggregateId, reason: impl Into<String>) -> Self {
        Self {
            payment_id,
            reason: reason.into(),
        }
    }
}

/// Commands accepted by the payment aggregate.
#[derive(Debug, Clone)]
pub enum PaymentCommand {
    Create(CreatePayment),
    Cancel(CancelPayment),
}

impl Command for PaymentCommand {
    fn aggregate_id(&self) -> AggregateId {
        match self {
            PaymentCommand::Create(cmd) => cmd.payment_id,
            PaymentCommand::Cancel(cmd) => cmd.payment_id,
        }
    }

    fn requires_existing(&self) -> bool {
        matches!(self, PaymentCommand::Cancel(_))
    }
}

impl From<CreatePayment> for PaymentCommand {
    fn from(cmd: CreatePayment) -> Self {
        PaymentCommand::Create(cmd)
    }
}

impl From<CancelPayment> for PaymentCommand {
    fn from(cmd: CancelPayment) -> Self {
        PaymentCommand::Cancel(cmd)
    }
}
