//! Order saga: stock, then coupon, then card.

use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use domain::{Money, OrderEvent};
use event_store::EventEnvelope;
use serde::{Deserialize, Serialize};

use crate::definition::{SagaDefinition, SagaStep};
use crate::error::Result;
use crate::ports::{CardPort, CouponPort, StockPort};

/// The saga type identifier for orders.
pub const SAGA_TYPE: &str = "OrderSaga";

/// Step name: deduct stock for the ordered product.
pub const STEP_DEDUCT_STOCK: &str = "deduct_stock";

/// Step name: apply the coupon part of the price.
pub const STEP_APPLY_COUPON: &str = "apply_coupon";

/// Step name: charge the card part of the price.
pub const STEP_CHARGE_CARD: &str = "charge_card";

/// Inputs for the order saga, copied from `OrderCreated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSagaContext {
    pub order_id: AggregateId,
    pub product_code: String,
    pub quantity: u32,
    pub card_payment: Money,
    pub coupon_payment: Money,
}

struct DeductStock {
    stock: Arc<dyn StockPort>,
}

#[async_trait]
impl SagaStep<OrderSagaContext> for DeductStock {
    fn name(&self) -> &'static str {
        STEP_DEDUCT_STOCK
    }

    async fn execute(&self, ctx: &OrderSagaContext) -> Result<bool> {
        Ok(self
            .stock
            .deduct(ctx.order_id, &ctx.product_code, ctx.quantity)
            .await?)
    }

    async fn compensate(&self, ctx: &OrderSagaContext) -> Result<()> {
        Ok(self.stock.cancel(ctx.order_id).await?)
    }
}

struct ApplyCoupon {
    coupon: Arc<dyn CouponPort>,
}

#[async_trait]
impl SagaStep<OrderSagaContext> for ApplyCoupon {
    fn name(&self) -> &'static str {
        STEP_APPLY_COUPON
    }

    async fn execute(&self, ctx: &OrderSagaContext) -> Result<bool> {
        Ok(self.coupon.apply(ctx.order_id, ctx.coupon_payment).await?)
    }

    async fn compensate(&self, ctx: &OrderSagaContext) -> Result<()> {
        Ok(self.coupon.cancel(ctx.order_id).await?)
    }
}

/// Last step, so it never needs undoing.
struct ChargeCard {
    card: Arc<dyn CardPort>,
}

#[async_trait]
impl SagaStep<OrderSagaContext> for ChargeCard {
    fn name(&self) -> &'static str {
        STEP_CHARGE_CARD
    }

    async fn execute(&self, ctx: &OrderSagaContext) -> Result<bool> {
        Ok(self.card.charge(ctx.order_id, ctx.card_payment).await?)
    }
}

/// Runs after every `OrderCreated`, keyed by order ID.
pub struct OrderSaga {
    steps: Vec<Box<dyn SagaStep<OrderSagaContext>>>,
}

impl OrderSaga {
    pub fn new(
        stock: Arc<dyn StockPort>,
        coupon: Arc<dyn CouponPort>,
        card: Arc<dyn CardPort>,
    ) -> Self {
        Self {
            steps: vec![
                Box::new(DeductStock { stock }),
                Box::new(ApplyCoupon { coupon }),
                Box::new(ChargeCard { card }),
            ],
        }
    }
}

#[async_trait]
impl SagaDefinition for OrderSaga {
    type Context = OrderSagaContext;

    fn saga_type(&self) -> &'static str {
        SAGA_TYPE
    }

    fn trigger_event_type(&self) -> &'static str {
        "OrderCreated"
    }

    fn context(&self, trigger: &EventEnvelope) -> Result<OrderSagaContext> {
        let OrderEvent::OrderCreated(data) = trigger.decode::<OrderEvent>()?;
        Ok(OrderSagaContext {
            order_id: data.order_id,
            product_code: data.product_code,
            quantity: data.quantity,
            card_payment: data.card_payment,
            coupon_payment: data.coupon_payment,
        })
    }

    fn association_key(&self, ctx: &OrderSagaContext) -> AggregateId {
        ctx.order_id
    }

    fn steps(&self) -> &[Box<dyn SagaStep<OrderSagaContext>>] {
        &self.steps
    }
}
