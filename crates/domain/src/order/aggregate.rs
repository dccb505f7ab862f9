//! Order aggregate implementation.

use chrono::Utc;
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::Money;

use super::{CreateOrder, OrderCreatedData, OrderError, OrderEvent};

/// Order aggregate root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    id: Option<AggregateId>,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    product_code: String,
    quantity: u32,
    card_payment: Money,
    coupon_payment: Money,
    price: Money,
}

impl Aggregate for Order {
    type Command = CreateOrder;
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
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

    fn handle(&self, cmd: &CreateOrder) -> Result<OrderEvent, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyCreated);
        }

        if cmd.product_code().trim().is_empty() {
            return Err(OrderError::ProductCodeRequired);
        }

        if cmd.quantity() == 0 {
            return Err(OrderError::InvalidQuantity {
                quantity: cmd.quantity(),
            });
        }

        for (component, amount) in [("card", cmd.card_payment()), ("coupon", cmd.coupon_payment())]
        {
            if amount.is_negative() {
                return Err(OrderError::NegativePayment { component, amount });
            }
        }

        if !cmd.price().is_positive() {
            return Err(OrderError::InvalidPrice { price: cmd.price() });
        }

        Ok(OrderEvent::OrderCreated(OrderCreatedData {
            order_id: cmd.order_id(),
            product_code: cmd.product_code().to_string(),
            quantity: cmd.quantity(),
            card_payment: cmd.card_payment(),
            coupon_payment: cmd.coupon_payment(),
            price: cmd.price(),
            created_at: Utc::now(),
        }))
    }

    fn apply(&mut self, event: &OrderEvent) {
        match event {
            OrderEvent::OrderCreated(data) => {
                self.id = Some(data.order_id);
                self.product_code = data.product_code.clone();
                self.quantity = data.quantity;
                self.card_payment = data.card_payment;
                self.coupon_payment = data.coupon_payment;
                self.price = data.price;
            }
        }
    }
}

// Query methods
impl Order {
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

    /// Price as recorded at creation. Not recomputed from the components.
    pub fn price(&self) -> Money {
        self.price
    }
}
