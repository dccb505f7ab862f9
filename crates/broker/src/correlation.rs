//! Request/reply correlation over one-way topics.
//!
//! A request goes out on one topic and its reply comes back on another,
//! tagged with the same key. `CorrelationClient` keeps one pending entry per
//! outstanding key and resolves it when the matching reply arrives.
//!
//! ```text
//! send_and_await(key) ─ register ─ publish(request_topic) ─┐
//!        ▲                                                 │
//!        │                                            peer handles
//!        │                                                 │
//!   oneshot ◄── on_reply(key) ◄── listener(reply_topic) ◄──┘
//! ```
//!
//! Each pending entry carries a ticket. The waiting call removes its entry on
//! every exit path, but only if the ticket still matches, so a stale cleanup
//! can never remove a newer registration for the same key.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use common::ShardedMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{CorrelationError, Message, MessageBroker};

/// What happened to an inbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDisposition {
    /// The reply completed a waiting request.
    Resolved,
    /// No request was waiting for this key; the reply was discarded.
    Unmatched,
}

struct PendingEntry {
    ticket: u64,
    registered_at: Instant,
    sender: oneshot::Sender<Message>,
}

/// Removes the owning call's entry when the call ends, however it ends.
struct PendingGuard<'a> {
    pending: &'a ShardedMap<String, PendingEntry>,
    key: String,
    ticket: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let ticket = self.ticket;
        self.pending.remove_if(&self.key, |entry| entry.ticket == ticket);
        metrics::gauge!("correlation_pending").set(self.pending.len() as f64);
    }
}

/// Issues requests on a topic and awaits their correlated replies.
#[derive(Clone)]
pub struct CorrelationClient {
    broker: Arc<dyn MessageBroker>,
    request_topic: String,
    pending: Arc<ShardedMap<String, PendingEntry>>,
    next_ticket: Arc<AtomicU64>,
}

impl CorrelationClient {
    /// Creates a client publishing requests on `request_topic`.
    pub fn new(broker: Arc<dyn MessageBroker>, request_topic: impl Into<String>) -> Self {
        Self {
            broker,
            request_topic: request_topic.into(),
            pending: Arc::new(ShardedMap::new()),
            next_ticket: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn request_topic(&self) -> &str {
        &self.request_topic
    }

    /// Publishes `payload` keyed by `key` and waits for the reply with the
    /// same key.
    ///
    /// The pending entry is registered before publishing, so a reply that
    /// arrives before `publish` returns is not lost. When this returns, for
    /// any reason, no entry remains for this call.
    ///
    /// # Errors
    ///
    /// - `DuplicatePending` if a request with `key` is already outstanding
    /// - `Publish` if the broker rejected the request
    /// - `Timeout` if no reply arrived within `timeout`
    /// - `Cancelled` if [`cancel_all`](Self::cancel_all) dropped the entry
    #[tracing::instrument(skip(self, payload), fields(topic = %self.request_topic))]
    pub async fn send_and_await(
        &self,
        key: String,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<Message, CorrelationError> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();

        let entry = PendingEntry {
            ticket,
            registered_at: Instant::now(),
            sender,
        };
        if self.pending.insert_if_absent(key.clone(), entry).is_err() {
            tracing::warn!("request already pending for this key");
            return Err(CorrelationError::DuplicatePending(key));
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            key: key.clone(),
            ticket,
        };
        metrics::counter!("correlation_requests_total").increment(1);
        metrics::gauge!("correlation_pending").set(self.pending.len() as f64);

        if let Err(e) = self
            .broker
            .publish(&self.request_topic, Message::new(key.clone(), payload))
            .await
        {
            tracing::warn!(error = %e, "request publish failed");
            return Err(e.into());
        }

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(CorrelationError::Cancelled(key)),
            Err(_) => {
                metrics::counter!("correlation_timeouts_total").increment(1);
                tracing::warn!(after = ?timeout, "no reply before timeout");
                Err(CorrelationError::Timeout {
                    key,
                    after: timeout,
                })
            }
        }
    }

    /// Routes an inbound reply to the request waiting on its key.
    ///
    /// The entry is removed before it is resolved, so a second reply for the
    /// same key finds nothing and is discarded.
    pub fn on_reply(&self, reply: Message) -> ReplyDisposition {
        let Some(entry) = self.pending.remove(&reply.key) else {
            metrics::counter!("correlation_unmatched_replies_total").increment(1);
            tracing::warn!(key = %reply.key, "reply has no pending request, discarding");
            return ReplyDisposition::Unmatched;
        };

        metrics::histogram!("correlation_reply_seconds")
            .record(entry.registered_at.elapsed().as_secs_f64());
        metrics::gauge!("correlation_pending").set(self.pending.len() as f64);

        let key = reply.key.clone();
        match entry.sender.send(reply) {
            Ok(()) => {
                tracing::debug!(%key, "reply matched");
                ReplyDisposition::Resolved
            }
            // The caller stopped waiting between our remove and send.
            Err(_) => {
                metrics::counter!("correlation_unmatched_replies_total").increment(1);
                tracing::warn!(%key, "reply arrived after the caller gave up, discarding");
                ReplyDisposition::Unmatched
            }
        }
    }

    /// Subscribes to `reply_topic` and feeds every message to [`on_reply`](Self::on_reply).
    ///
    /// The subscription is in place before this returns.
    pub fn spawn_reply_listener(&self, reply_topic: &str) -> JoinHandle<()> {
        let mut subscription = self.broker.subscribe(reply_topic);
        let client = self.clone();

        tokio::spawn(async move {
            tracing::info!(topic = %subscription.topic(), "reply listener started");
            while let Some(reply) = subscription.recv().await {
                client.on_reply(reply);
            }
            tracing::info!(topic = %subscription.topic(), "reply listener stopped");
        })
    }

    /// Number of requests currently waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Fails every waiting request with `Cancelled`. Returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let drained = self.pending.drain();
        metrics::gauge!("correlation_pending").set(0.0);
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "cancelled pending requests");
        }
        drained.len()
    }
}
