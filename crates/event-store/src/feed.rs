//! Live feed of appended events.

use tokio::sync::broadcast::{self, error::RecvError};

use crate::EventEnvelope;

/// One item read from the live feed.
#[derive(Debug, Clone)]
pub enum FeedItem {
    /// The next appended event.
    Event(EventEnvelope),

    /// The subscriber fell behind and this many events were dropped from
    /// its buffer. They are still in the store.
    Lagged(u64),
}

/// A subscription to every event appended after it was created.
///
/// Events arrive in append order. A subscriber that falls more than the
/// feed capacity behind gets [`FeedItem::Lagged`] in place of the oldest
/// events and must re-read the store (catch-up) to recover them.
pub struct EventSubscription {
    rx: broadcast::Receiver<EventEnvelope>,
}

impl EventSubscription {
    pub(crate) fn new(rx: broadcast::Receiver<EventEnvelope>) -> Self {
        Self { rx }
    }

    /// Waits for the next item. Returns `None` once the store is dropped.
    pub async fn next(&mut self) -> Option<FeedItem> {
        match self.rx.recv().await {
            Ok(event) => Some(FeedItem::Event(event)),
            Err(RecvError::Lagged(skipped)) => {
                metrics::counter!("event_feed_lagged_total").increment(skipped);
                tracing::warn!(skipped, "event feed subscriber lagged, events dropped");
                Some(FeedItem::Lagged(skipped))
            }
            Err(RecvError::Closed) => None,
        }
    }
}
