//! Topic-based one-way messaging.

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{Message, Result};

/// A one-way asynchronous channel organised by topic.
///
/// Publishing does not wait for any consumer. Subscribers only see messages
/// published after they subscribed.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publishes a message on a topic.
    async fn publish(&self, topic: &str, message: Message) -> Result<()>;

    /// Subscribes to a topic. The subscription is live as soon as this returns.
    fn subscribe(&self, topic: &str) -> Subscription;
}

/// Receiving end of a topic subscription.
pub struct Subscription {
    topic: String,
    rx: broadcast::Receiver<Message>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, rx: broadcast::Receiver<Message>) -> Self {
        Self {
            topic: topic.into(),
            rx,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the next message. Returns `None` once the topic is closed.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %self.topic, skipped, "subscriber lagged, messages skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
