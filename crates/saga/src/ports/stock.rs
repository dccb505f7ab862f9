//! Stock port and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::AggregateId;

use super::CallJournal;
use crate::error::PortError;

/// Trait for stock operations.
#[async_trait]
pub trait StockPort: Send + Sync {
    /// Deducts stock for an order. Returns false if the deduction is refused.
    async fn deduct(
        &self,
        order_id: AggregateId,
        product_code: &str,
        quantity: u32,
    ) -> Result<bool, PortError>;

    /// Gives back the stock deducted for an order, if any.
    async fn cancel(&self, order_id: AggregateId) -> Result<(), PortError>;
}

#[derive(Debug, Default)]
struct InMemoryStockState {
    /// Tracked stock levels. Products without an entry are unlimited.
    levels: HashMap<String, u32>,
    deductions: HashMap<AggregateId, (String, u32)>,
    fail_on_deduct: bool,
    fail_on_cancel: bool,
}

/// In-memory stock service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockPort {
    state: Arc<RwLock<InMemoryStockState>>,
    journal: Option<CallJournal>,
}

impl InMemoryStockPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records this port's calls in `journal`. Ports built without one
    /// keep no call history.
    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Tracks a stock level for `product_code`.
    pub fn with_stock(self, product_code: impl Into<String>, quantity: u32) -> Self {
        self.write().levels.insert(product_code.into(), quantity);
        self
    }

    /// Configures the port to refuse deductions.
    pub fn set_fail_on_deduct(&self, fail: bool) {
        self.write().fail_on_deduct = fail;
    }

    /// Configures the port to error on cancellation.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.write().fail_on_cancel = fail;
    }

    /// Returns the tracked level for a product.
    pub fn available(&self, product_code: &str) -> Option<u32> {
        self.read().levels.get(product_code).copied()
    }

    /// Returns true if stock is currently deducted for the order.
    pub fn is_deducted(&self, order_id: AggregateId) -> bool {
        self.read().deductions.contains_key(&order_id)
    }

    pub fn deduction_count(&self) -> usize {
        self.read().deductions.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryStockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryStockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StockPort for InMemoryStockPort {
    async fn deduct(
        &self,
        order_id: AggregateId,
        product_code: &str,
        quantity: u32,
    ) -> Result<bool, PortError> {
        if let Some(journal) = &self.journal {
            journal.record("stock", "deduct", order_id);
        }
        let mut state = self.write();

        if state.fail_on_deduct {
            return Ok(false);
        }
        if state.deductions.contains_key(&order_id) {
            tracing::debug!(%order_id, "stock already deducted for order");
            return Ok(true);
        }

        if let Some(level) = state.levels.get_mut(product_code) {
            if *level < quantity {
                tracing::info!(%order_id, product_code, quantity, available = *level, "insufficient stock");
                return Ok(false);
            }
            *level -= quantity;
        }
        state
            .deductions
            .insert(order_id, (product_code.to_string(), quantity));
        Ok(true)
    }

    async fn cancel(&self, order_id: AggregateId) -> Result<(), PortError> {
        if let Some(journal) = &self.journal {
            journal.record("stock", "cancel", order_id);
        }
        let mut state = self.write();

        if state.fail_on_cancel {
            return Err(PortError::unavailable("stock", "cancellation refused"));
        }

        // Cancelling an order with nothing deducted is a no-op.
        if let Some((product_code, quantity)) = state.deductions.remove(&order_id) {
            if let Some(level) = state.levels.get_mut(&product_code) {
                *level += quantity;
            }
        }
        Ok(())
    }
}
