//! The answering side of a request/reply exchange.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::{Message, MessageBroker};

/// Decides how to answer one request.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Returns the reply to publish, or `None` to leave the request unanswered.
    async fn handle(&self, request: Message) -> Option<Message>;
}

/// Consumes requests from one topic and publishes replies on another.
///
/// Each request is handled on its own task, so a slow answer does not hold up
/// the ones behind it.
pub struct Responder {
    broker: Arc<dyn MessageBroker>,
    request_topic: String,
    reply_topic: String,
}

impl Responder {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        request_topic: impl Into<String>,
        reply_topic: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            request_topic: request_topic.into(),
            reply_topic: reply_topic.into(),
        }
    }

    /// Starts answering. The request subscription is live before this returns.
    pub fn spawn<H: RequestHandler>(self, handler: Arc<H>) -> JoinHandle<()> {
        let mut requests = self.broker.subscribe(&self.request_topic);
        let reply_topic: Arc<str> = self.reply_topic.into();
        let broker = self.broker;

        tokio::spawn(async move {
            tracing::info!(topic = %requests.topic(), "responder started");
            while let Some(request) = requests.recv().await {
                let handler = Arc::clone(&handler);
                let broker = Arc::clone(&broker);
                let reply_topic = Arc::clone(&reply_topic);

                tokio::spawn(async move {
                    let key = request.key.clone();
                    let Some(reply) = handler.handle(request).await else {
                        tracing::debug!(%key, "request left unanswered");
                        return;
                    };
                    if let Err(e) = broker.publish(&reply_topic, reply).await {
                        tracing::error!(%key, error = %e, "failed to publish reply");
                    }
                });
            }
            tracing::info!(topic = %requests.topic(), "responder stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryBroker;

    struct Doubler;

    #[async_trait]
    impl RequestHandler for Doubler {
        async fn handle(&self, request: Message) -> Option<Message> {
            let n = request.payload.as_i64()?;
            Some(Message::new(request.key, serde_json::json!(n * 2)))
        }
    }

    #[tokio::test]
    async fn replies_on_reply_topic() {
        let broker = InMemoryBroker::new();
        let mut replies = broker.subscribe("out");
        let _responder =
            Responder::new(Arc::new(broker.clone()), "in", "out").spawn(Arc::new(Doubler));

        broker
            .publish("in", Message::new("k", serde_json::json!(21)))
            .await
            .unwrap();

        let reply = replies.recv().await.unwrap();
        assert_eq!(reply.key, "k");
        assert_eq!(reply.payload, serde_json::json!(42));
    }

    #[tokio::test]
    async fn unanswerable_request_produces_nothing() {
        let broker = InMemoryBroker::recording();
        let _responder =
            Responder::new(Arc::new(broker.clone()), "in", "out").spawn(Arc::new(Doubler));

        broker
            .publish("in", Message::new("bad", serde_json::json!("not a number")))
            .await
            .unwrap();
        broker
            .publish("in", Message::new("good", serde_json::json!(1)))
            .await
            .unwrap();

        // Wait until the good request has been answered.
        while broker.published_on("out").is_empty() {
            tokio::task::yield_now().await;
        }
        let keys: Vec<_> = broker
            .published_on("out")
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["good"]);
    }
}
