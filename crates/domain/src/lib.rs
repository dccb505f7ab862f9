//! Domain layer for the order and payment services.
//!
//! This crate provides the core domain abstractions including:
//! - Aggregate trait for event-sourced entities
//! - DomainEvent trait for domain events
//! - Command trait and CommandHandler for command processing
//! - Order and Payment aggregates with their service façades

pub mod aggregate;
pub mod command;
pub mod error;
pub mod money;
pub mod order;
pub mod payment;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
pub use money::Money;
pub use order::{CreateOrder, Order, OrderCreatedData, OrderError, OrderEvent, OrderService};
pub use payment::{
    CancelPayment, CreatePayment, Payment, PaymentCancelledData, PaymentCommand,
    PaymentCreatedData, PaymentError, PaymentEvent, PaymentService, PaymentStatus,
};
