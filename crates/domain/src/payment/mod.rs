//! Payment aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;

pub use aggregate::{Payment, PaymentStatus};
pub use commands::{CancelPayment, CreatePayment, PaymentCommand};
pub use events::{PaymentCancelledData, PaymentCreatedData, PaymentEvent};
pub use service::PaymentService;

use thiserror::Error;

use crate::Money;

/// Errors that can occur during payment operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("User ID is required")]
    UserIdRequired,

    #[error("Invalid amount: {amount} (must be greater than 0)")]
    InvalidAmount { amount: Money },

    /// Currency is not a three-letter uppercase code.
    #[error("Invalid currency code: {currency:?}")]
    InvalidCurrency { currency: String },

    #[error("Payment already created")]
    AlreadyCreated,

    #[error("Payment already cancelled")]
    AlreadyCancelled,
}
