//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;

pub use aggregate::Order;
pub use commands::CreateOrder;
pub use events::{OrderCreatedData, OrderEvent};
pub use service::OrderService;

use thiserror::Error;

use crate::Money;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Product code is required.
    #[error("Product code is required")]
    ProductCodeRequired,

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// A payment component is negative.
    #[error("Invalid {component} payment: {amount} (must not be negative)")]
    NegativePayment {
        component: &'static str,
        amount: Money,
    },

    /// Card and coupon payments together do not cover anything.
    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: Money },

    /// Card plus coupon payment does not fit in an amount.
    #[error("Price overflow: card {card_payment} + coupon {coupon_payment}")]
    PriceOverflow {
        card_payment: Money,
        coupon_payment: Money,
    },

    /// Order is already created.
    #[error("Order already created")]
    AlreadyCreated,
}
