//! Payment domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::Money;

/// Events that can occur on a payment aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PaymentEvent {
    /// Payment was created.
    PaymentCreated(PaymentCreatedData),

    /// Payment was cancelled, usually as a compensation.
    PaymentCancelled(PaymentCancelledData),
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentCreated(_) => "PaymentCreated",
            PaymentEvent::PaymentCancelled(_) => "PaymentCancelled",
        }
    }
}

/// Data for PaymentCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCreatedData {
    pub payment_id: AggregateId,
    pub user_id: String,
    pub amount: Money,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Data for PaymentCancelled event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCancelledData {
    pub payment_id: AggregateId,
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
}
