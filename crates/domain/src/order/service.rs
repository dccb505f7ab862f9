//! Order service providing a simplified API for order operations.

use common::AggregateId;
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::Money;

use super::{CreateOrder, Order};

/// Service for managing orders.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore> OrderService<S> {
    /// Creates a new order service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Creates a new order.
    #[tracing::instrument(skip(self), fields(order_id = %cmd.order_id()))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<CommandResult<Order>, DomainError> {
        let result = self.handler.execute(cmd).await;
        match &result {
            Ok(_) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!("order created");
            }
            Err(e) => tracing::info!(error = %e, "order rejected"),
        }
        result
    }

    /// Builds and executes a [`CreateOrder`] from its fields.
    pub async fn place_order(
        &self,
        product_code: impl Into<String>,
        quantity: u32,
        card_payment: Money,
        coupon_payment: Money,
    ) -> Result<CommandResult<Order>, DomainError> {
        let cmd = CreateOrder::new(product_code, quantity, card_payment, coupon_payment)?;
        self.create_order(cmd).await
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id).await
    }
}
