//! External resource ports and their adapters.
//!
//! Every call a saga makes leaves the process through one of these traits.
//! Adapters are injected as `Arc<dyn Port>` and must be idempotent per
//! identifier, since a trigger may be delivered more than once.

pub mod card;
pub mod coupon;
pub mod foreign;
pub mod gateway;
pub mod stock;

use std::sync::{Arc, Mutex, PoisonError};

use common::AggregateId;

pub use card::{
    BrokerCardPort, CARD_REQUEST_TOPIC, CARD_RESULT_TOPIC, CardPaymentRequest, CardPaymentResult,
    CardPort, InMemoryCardPort,
};
pub use coupon::{CouponPort, InMemoryCouponPort};
pub use foreign::{ForeignPaymentPort, InMemoryForeignPaymentPort};
pub use gateway::CardGatewaySimulator;
pub use stock::{InMemoryStockPort, StockPort};

/// One recorded port call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCall {
    pub port: &'static str,
    pub operation: &'static str,
    pub id: AggregateId,
}

impl std::fmt::Display for PortCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.port, self.operation)
    }
}

/// Shared log of calls across in-memory adapters, in call order.
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    calls: Arc<Mutex<Vec<PortCall>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, port: &'static str, operation: &'static str, id: AggregateId) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PortCall {
                port,
                operation,
                id,
            });
    }

    pub fn calls(&self) -> Vec<PortCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls made for one identifier, rendered as `port.operation`.
    pub fn operations_for(&self, id: AggregateId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.id == id)
            .map(|call| call.to_string())
            .collect()
    }

    /// Number of calls to `port.operation` across all identifiers.
    pub fn count(&self, port: &str, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| call.port == port && call.operation == operation)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_filters_by_identifier() {
        let journal = CallJournal::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        journal.record("stock", "deduct", a);
        journal.record("stock", "deduct", b);
        journal.record("coupon", "apply", a);

        assert_eq!(journal.operations_for(a), vec!["stock.deduct", "coupon.apply"]);
        assert_eq!(journal.count("stock", "deduct"), 2);
    }
}
