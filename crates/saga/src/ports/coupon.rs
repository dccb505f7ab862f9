//! Coupon port and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::AggregateId;
use domain::Money;

use super::CallJournal;
use crate::error::PortError;

/// Trait for coupon operations.
#[async_trait]
pub trait CouponPort: Send + Sync {
    /// Applies a coupon amount to an order.
    async fn apply(&self, order_id: AggregateId, amount: Money) -> Result<bool, PortError>;

    /// Releases the coupon applied to an order.
    async fn cancel(&self, order_id: AggregateId) -> Result<(), PortError>;
}

#[derive(Debug, Default)]
struct InMemoryCouponState {
    applied: HashMap<AggregateId, Money>,
    fail_on_apply: bool,
    fail_on_cancel: bool,
}

/// In-memory coupon service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCouponPort {
    state: Arc<RwLock<InMemoryCouponState>>,
    journal: Option<CallJournal>,
}

impl InMemoryCouponPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records this port's calls in `journal`. Ports built without one
    /// keep no call history.
    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn set_fail_on_apply(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_apply = fail;
    }

    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_cancel = fail;
    }

    /// Returns the amount currently applied for an order.
    pub fn applied_amount(&self, order_id: AggregateId) -> Option<Money> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .applied
            .get(&order_id)
            .copied()
    }
}

#[async_trait]
impl CouponPort for InMemoryCouponPort {
    async fn apply(&self, order_id: AggregateId, amount: Money) -> Result<bool, PortError> {
        if let Some(journal) = &self.journal {
            journal.record("coupon", "apply", order_id);
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.fail_on_apply || amount.is_negative() {
            return Ok(false);
        }
        state.applied.entry(order_id).or_insert(amount);
        Ok(true)
    }

    async fn cancel(&self, order_id: AggregateId) -> Result<(), PortError> {
        if let Some(journal) = &self.journal {
            journal.record("coupon", "cancel", order_id);
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.fail_on_cancel {
            return Err(PortError::unavailable("coupon", "cancellation refused"));
        }
        state.applied.remove(&order_id);
        Ok(())
    }
}
