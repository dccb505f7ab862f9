//! Payment aggregate implementation.

use chrono::Utc;
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::Money;

use super::{
    CancelPayment, CreatePayment, PaymentCancelledData, PaymentCommand, PaymentCreatedData,
    PaymentError, PaymentEvent,
};

/// Lifecycle of a payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// No creation event yet.
    #[default]
    New,
    Created,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::New => "New",
            PaymentStatus::Created => "Created",
            PaymentStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment aggregate root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    user_id: String,
    amount: Money,
    currency: String,
    status: PaymentStatus,
    cancellation_reason: Option<String>,
}

impl Aggregate for Payment {
    type Command = PaymentCommand;
    type Event = PaymentEvent;
    type Error = PaymentError;

    fn aggregate_type() -> &'static str {
        "Payment"
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

    fn handle(&self, command: &PaymentCommand) -> Result<PaymentEvent, PaymentError> {
        match command {
            PaymentCommand::Create(cmd) => self.create(cmd),
            PaymentCommand::Cancel(cmd) => self.cancel(cmd),
        }
    }

    fn apply(&mut self, event: &PaymentEvent) {
        match event {
            PaymentEvent::PaymentCreated(data) => {
                self.id = Some(data.payment_id);
                self.user_id = data.user_id.clone();
                self.amount = data.amount;
                self.currency = data.currency.clone();
                self.status = PaymentStatus::Created;
            }
            // The amount stays as created; cancellation only records why.
            PaymentEvent::PaymentCancelled(data) => {
                self.status = PaymentStatus::Cancelled;
                self.cancellation_reason = Some(data.reason.clone());
            }
        }
    }
}

// Query methods
impl Payment {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == PaymentStatus::Cancelled
    }
}

// Command methods (return events)
impl Payment {
    fn create(&self, cmd: &CreatePayment) -> Result<PaymentEvent, PaymentError> {
        if self.id.is_some() {
            return Err(PaymentError::AlreadyCreated);
        }

        if cmd.user_id.trim().is_empty() {
            return Err(PaymentError::UserIdRequired);
        }

        if !cmd.amount.is_positive() {
            return Err(PaymentError::InvalidAmount { amount: cmd.amount });
        }

        if !is_currency_code(&cmd.currency) {
            return Err(PaymentError::InvalidCurrency {
                currency: cmd.currency.clone(),
            });
        }

        Ok(PaymentEvent::PaymentCreated(PaymentCreatedData {
            payment_id: cmd.payment_id,
            user_id: cmd.user_id.clone(),
            amount: cmd.amount,
            currency: cmd.currency.clone(),
            created_at: Utc::now(),
        }))
    }

    fn cancel(&self, cmd: &CancelPayment) -> Result<PaymentEvent, PaymentError> {
        if self.is_cancelled() {
            return Err(PaymentError::AlreadyCancelled);
        }

        Ok(PaymentEvent::PaymentCancelled(PaymentCancelledData {
            payment_id: cmd.payment_id,
            reason: cmd.reason.clone(),
            cancelled_at: Utc::now(),
        }))
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}
