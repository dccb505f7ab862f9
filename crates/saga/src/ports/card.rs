//! Card payment port: an in-memory implementation and one that talks to a
//! card processor over the message broker.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use broker::CorrelationClient;
use common::AggregateId;
use domain::Money;
use serde::{Deserialize, Serialize};

use super::CallJournal;
use crate::error::PortError;

/// Topic carrying card charge requests.
pub const CARD_REQUEST_TOPIC: &str = "card-payment-request";

/// Topic carrying card charge outcomes.
pub const CARD_RESULT_TOPIC: &str = "card-payment-result";

/// Trait for card charges.
///
/// Card charges are the last step of an order, so there is no cancel.
#[async_trait]
pub trait CardPort: Send + Sync {
    async fn charge(&self, order_id: AggregateId, amount: Money) -> Result<bool, PortError>;
}

/// Body of a charge request on [`CARD_REQUEST_TOPIC`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardPaymentRequest {
    pub order_id: AggregateId,
    pub amount: Money,
}

/// Body of a charge outcome on [`CARD_RESULT_TOPIC`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardPaymentResult {
    pub order_id: AggregateId,
    pub success: bool,
}

#[derive(Debug, Default)]
struct InMemoryCardState {
    charges: HashMap<AggregateId, Money>,
    fail_on_charge: bool,
}

/// In-memory card processor for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCardPort {
    state: Arc<RwLock<InMemoryCardState>>,
    journal: Option<CallJournal>,
}

impl InMemoryCardPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records this port's calls in `journal`. Ports built without one
    /// keep no call history.
    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Configures the port to decline every charge.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_charge = fail;
    }

    pub fn charged_amount(&self, order_id: AggregateId) -> Option<Money> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .charges
            .get(&order_id)
            .copied()
    }

    pub fn charge_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .charges
            .len()
    }
}

#[async_trait]
impl CardPort for InMemoryCardPort {
    async fn charge(&self, order_id: AggregateId, amount: Money) -> Result<bool, PortError> {
        if let Some(journal) = &self.journal {
            journal.record("card", "charge", order_id);
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.fail_on_charge || amount.is_negative() {
            return Ok(false);
        }
        state.charges.entry(order_id).or_insert(amount);
        Ok(true)
    }
}

/// Charges cards by asking a remote card processor over the broker.
///
/// The order ID is the correlation key. A reply that does not arrive in
/// time, a request that cannot be published and a reply that cannot be read
/// all count as a declined charge.
#[derive(Clone)]
pub struct BrokerCardPort {
    client: CorrelationClient,
    timeout: Duration,
}

impl BrokerCardPort {
    /// `client` must publish on [`CARD_REQUEST_TOPIC`] and have a reply
    /// listener on [`CARD_RESULT_TOPIC`].
    pub fn new(client: CorrelationClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl CardPort for BrokerCardPort {
    #[tracing::instrument(skip_all, fields(%order_id, %amount))]
    async fn charge(&self, order_id: AggregateId, amount: Money) -> Result<bool, PortError> {
        let payload = serde_json::to_value(CardPaymentRequest { order_id, amount })?;

        let reply = match self
            .client
            .send_and_await(order_id.to_string(), payload, self.timeout)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "card charge got no usable reply");
                return Ok(false);
            }
        };

        match reply.decode::<CardPaymentResult>() {
            Ok(result) if result.order_id == order_id => Ok(result.success),
            Ok(result) => {
                tracing::warn!(reply_order_id = %result.order_id, "card reply names another order");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(error = %e, "card reply could not be decoded");
                Ok(false)
            }
        }
    }
}
