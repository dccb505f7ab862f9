//! Foreign-currency payment port and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::AggregateId;
use domain::Money;

use super::CallJournal;
use crate::error::PortError;

/// Largest amount the in-memory settlement approves by default.
pub const DEFAULT_FOREIGN_APPROVAL_LIMIT: Money = Money::new(1000);

/// Trait for foreign-currency settlement.
///
/// There is no cancel operation: a failed settlement is compensated by
/// cancelling the payment aggregate.
#[async_trait]
pub trait ForeignPaymentPort: Send + Sync {
    async fn charge(
        &self,
        payment_id: AggregateId,
        amount: Money,
        currency: &str,
    ) -> Result<bool, PortError>;
}

#[derive(Debug, Default)]
struct InMemoryForeignState {
    settled: HashMap<AggregateId, (Money, String)>,
    fail_on_charge: bool,
}

/// In-memory settlement that approves amounts up to a limit.
#[derive(Debug, Clone)]
pub struct InMemoryForeignPaymentPort {
    state: Arc<RwLock<InMemoryForeignState>>,
    approval_limit: Money,
    journal: Option<CallJournal>,
}

impl InMemoryForeignPaymentPort {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_FOREIGN_APPROVAL_LIMIT)
    }

    pub fn with_limit(approval_limit: Money) -> Self {
        Self {
            state: Arc::default(),
            approval_limit,
            journal: None,
        }
    }

    /// Records this port's calls in `journal`. Ports built without one
    /// keep no call history.
    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_charge = fail;
    }

    pub fn is_settled(&self, payment_id: AggregateId) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .settled
            .contains_key(&payment_id)
    }
}

impl Default for InMemoryForeignPaymentPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ForeignPaymentPort for InMemoryForeignPaymentPort {
    async fn charge(
        &self,
        payment_id: AggregateId,
        amount: Money,
        currency: &str,
    ) -> Result<bool, PortError> {
        if let Some(journal) = &self.journal {
            journal.record("foreign", "charge", payment_id);
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.fail_on_charge {
            return Ok(false);
        }
        if state.settled.contains_key(&payment_id) {
            return Ok(true);
        }
        if !amount.is_positive() || amount > self.approval_limit {
            tracing::info!(%payment_id, %amount, currency, limit = %self.approval_limit, "foreign payment refused");
            return Ok(false);
        }

        state
            .settled
            .insert(payment_id, (amount, currency.to_string()));
        Ok(true)
    }
}
