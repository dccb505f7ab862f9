//! Order domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::Money;

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was created.
    OrderCreated(OrderCreatedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "OrderCreated",
        }
    }
}

/// Data for OrderCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    /// The unique order ID.
    pub order_id: AggregateId,

    /// Product being ordered.
    pub product_code: String,

    /// Units of the product.
    pub quantity: u32,

    /// Part of the price charged to the card.
    pub card_payment: Money,

    /// Part of the price covered by a coupon.
    pub coupon_payment: Money,

    /// Total price at creation time.
    pub price: Money,

    /// When the order was created.
    pub created_at: DateTime<Utc>,
}
