//! Simulated card processor answering charge requests over the broker.

use async_trait::async_trait;
use broker::{Message, RequestHandler};
use domain::Money;

use super::card::{CardPaymentRequest, CardPaymentResult};

/// Approves card charges up to a limit.
///
/// Run it behind a [`broker::Responder`] on the card request and result
/// topics.
#[derive(Debug, Clone)]
pub struct CardGatewaySimulator {
    approval_limit: Money,
}

impl CardGatewaySimulator {
    pub fn new(approval_limit: Money) -> Self {
        Self { approval_limit }
    }

    /// Decides whether a charge is approved.
    pub fn approves(&self, amount: Money) -> bool {
        !amount.is_negative() && amount <= self.approval_limit
    }
}

#[async_trait]
impl RequestHandler for CardGatewaySimulator {
    async fn handle(&self, request: Message) -> Option<Message> {
        let charge: CardPaymentRequest = match request.decode() {
            Ok(charge) => charge,
            Err(e) => {
                tracing::warn!(key = %request.key, error = %e, "malformed card request ignored");
                return None;
            }
        };

        let result = CardPaymentResult {
            order_id: charge.order_id,
            success: self.approves(charge.amount),
        };
        tracing::info!(order_id = %result.order_id, amount = %charge.amount, success = result.success, "card charge decided");

        match Message::from_payload(request.key, &result) {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode card result");
                None
            }
        }
    }
}
