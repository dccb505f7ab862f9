//! Order commands.

use common::AggregateId;

use crate::command::Command;

use super::OrderError;
use crate::Money;

/// Command to create a new order.
///
/// The order ID is generated and the price is fixed when the command is
/// built. Neither changes afterwards.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    order_id: AggregateId,
    product_code: String,
    quantity: u32,
    card_payment: Money,
    coupon_payment: Money,
    price: Money,
}

impl CreateOrder {
    /// Creates a new CreateOrder command with a fresh order ID.
    ///
    /// Fails only if `card_payment + coupon_payment` overflows.
    pub fn new(
        product_code: impl Into<String>,
        quantity: u32,
        card_payment: Money,
        coupon_payment: Money,
    ) -> Result<Self, OrderError> {
        let price =
            card_payment
                .checked_add(coupon_payment)
                .ok_or(OrderError::PriceOverflow {
                    card_payment,
                    coupon_payment,
                })?;

        Ok(Self {
            order_id: AggregateId::new(),
            product_code: product_code.into(),
            quantity,
            card_payment,
            coupon_payment,
            price,
        })
    }

    pub fn order_id(&self) -> AggregateId {
        self.order_id
    }

    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn card_payment(&self) -> Money {
        self.card_payment
    }

    pub fn coupon_payment(&self) -> Money {
        self.coupon_payment
    }

    /// Card payment plus coupon payment, as computed at construction.
    pub fn price(&self) -> Money {
        self.price
    }
}

impl Command for CreateOrder {
    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }

    fn requires_existing(&self) -> bool {
        false
    }
}
