use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{BrokerError, Message, MessageBroker, Result, Subscription};

const DEFAULT_TOPIC_CAPACITY: usize = 256;

/// In-memory broker with one broadcast channel per topic.
///
/// Messages published to a topic with no subscribers are dropped, as a real
/// broker with no consumer group attached would. A broker built with
/// [`InMemoryBroker::recording`] also keeps every accepted message for
/// inspection.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<Inner>,
}

struct Inner {
    topics: RwLock<HashMap<String, broadcast::Sender<Message>>>,
    history: Option<Mutex<Vec<(String, Message)>>>,
    capacity: usize,
    fail_on_publish: AtomicBool,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TOPIC_CAPACITY)
    }

    /// Creates a broker whose topics buffer up to `capacity` messages per
    /// subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::build(capacity, None)
    }

    /// Creates a broker that keeps every accepted message, readable through
    /// [`InMemoryBroker::published_on`].
    pub fn recording() -> Self {
        Self::build(DEFAULT_TOPIC_CAPACITY, Some(Mutex::new(Vec::new())))
    }

    fn build(capacity: usize, history: Option<Mutex<Vec<(String, Message)>>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: RwLock::new(HashMap::new()),
                history,
                capacity: capacity.max(1),
                fail_on_publish: AtomicBool::new(false),
            }),
        }
    }

    /// Configure the broker to reject every publish.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.inner.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Number of live subscribers on a topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Messages accepted on `topic`, oldest first. Always empty unless the
    /// broker is recording.
    pub fn published_on(&self, topic: &str) -> Vec<Message> {
        let Some(history) = &self.inner.history else {
            return Vec::new();
        };
        history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Message> {
        if let Some(sender) = self
            .inner
            .topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
        {
            return sender.clone();
        }

        self.inner
            .topics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .clone()
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, topic: &str, message: Message) -> Result<()> {
        if topic.is_empty() {
            return Err(BrokerError::InvalidTopic(topic.to_string()));
        }

        if self.inner.fail_on_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::PublishFailed {
                topic: topic.to_string(),
                reason: "simulated broker failure".to_string(),
            });
        }

        tracing::debug!(topic, key = %message.key, "publishing message");
        if let Some(history) = &self.inner.history {
            history
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((topic.to_string(), message.clone()));
        }

        // An error only means nobody is subscribed; the message is dropped.
        let _ = self.sender(topic).send(message);
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Subscription {
        Subscription::new(topic, self.sender(topic).subscribe())
    }
}
