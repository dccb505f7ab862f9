use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use crate::{
    AggregateId, EventEnvelope, EventStoreError, EventSubscription, Result, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

const DEFAULT_FEED_CAPACITY: usize = 1024;

/// In-memory event store.
///
/// Events are kept in append order in a single log. Every successful append
/// is also published to live subscribers, in the same order.
#[derive(Clone)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
    feed: broadcast::Sender<EventEnvelope>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::with_feed_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Creates a store whose live feed buffers up to `capacity` events per
    /// subscriber before the slowest one starts skipping.
    pub fn with_feed_capacity(capacity: usize) -> Self {
        let (feed, _) = broadcast::channel(capacity.max(1));
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            feed,
        }
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clears all events.
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id;
        let first_new_version = events[0].version;

        let mut store = self.events.write().await;

        // Get current version for this aggregate
        let current_version = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(Version::initial());

        // Check expected version if specified
        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            metrics::counter!("event_store_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // Unique (aggregate, version) constraint
        if first_new_version != current_version.next() {
            metrics::counter!("event_store_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(first_new_version);

        metrics::counter!("event_store_appended_total").increment(events.len() as u64);
        for event in &events {
            tracing::debug!(
                aggregate_id = %event.aggregate_id,
                event_type = %event.event_type,
                version = %event.version,
                "event appended"
            );
            // Publishing under the write lock keeps feed order equal to log order.
            // An error only means nobody is subscribed.
            let _ = self.feed.send(event.clone());
        }
        store.extend(events);

        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let store = self.events.read().await;
        let mut events: Vec<_> = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        let store = self.events.read().await;
        Ok(store
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.events.read().await.clone();
        let stream = stream::iter(events.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let store = self.events.read().await;
        let version = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max();
        Ok(version)
    }

    fn subscribe(&self) -> EventSubscription {
        EventSubscription::new(self.feed.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeedItem;

    fn create_test_event(
        aggregate_id: AggregateId,
        version: Version,
        event_type: &str,
    ) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("TestAggregate")
            .event_type(event_type)
            .version(version)
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn append_single_event() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();
        let event = create_test_event(aggregate_id, Version::first(), "TestEvent");

        let result = store.append(vec![event], AppendOptions::expect_new()).await;
        assert_eq!(result.unwrap(), Version::first());

        let events = store.get_events_for_aggregate(aggregate_id).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn append_multiple_events() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let events = vec![
            create_test_event(aggregate_id, Version::new(1), "Event1"),
            create_test_event(aggregate_id, Version::new(2), "Event2"),
            create_test_event(aggregate_id, Version::new(3), "Event3"),
        ];

        let result = store.append(events, AppendOptions::expect_new()).await;
        assert_eq!(result.unwrap(), Version::new(3));
        assert_eq!(store.event_count().await, 3);
    }

    #[tokio::test]
    async fn concurrency_conflict_on_wrong_version() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let event1 = create_test_event(aggregate_id, Version::first(), "Event1");
        store
            .append(vec![event1], AppendOptions::expect_new())
            .await
            .unwrap();

        let event2 = create_test_event(aggregate_id, Version::new(2), "Event2");
        let result = store
            .append(vec![event2], AppendOptions::expect_new())
            .await;

        let err = result.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn expected_version_match_succeeds() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let event1 = create_test_event(aggregate_id, Version::first(), "Event1");
        store
            .append(vec![event1], AppendOptions::expect_new())
            .await
            .unwrap();

        let event2 = create_test_event(aggregate_id, Version::new(2), "Event2");
        let result = store
            .append(
                vec![event2],
                AppendOptions::expect_version(Version::first()),
            )
            .await;

        assert_eq!(result.unwrap(), Version::new(2));
    }

    #[tokio::test]
    async fn duplicate_version_without_expectation_conflicts() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        store
            .append(
                vec![create_test_event(aggregate_id, Version::first(), "Event1")],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let result = store
            .append(
                vec![create_test_event(aggregate_id, Version::first(), "Event1")],
                AppendOptions::new(),
            )
            .await;
        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_batch_is_rejected_before_locking() {
        let store = InMemoryEventStore::new();
        let result = store.append(Vec::new(), AppendOptions::new()).await;
        assert!(matches!(result, Err(EventStoreError::InvalidAppend(_))));
    }

    #[tokio::test]
    async fn get_events_by_type() {
        let store = InMemoryEventStore::new();
        let id1 = AggregateId::new();
        let id2 = AggregateId::new();

        store
            .append(
                vec![create_test_event(id1, Version::first(), "OrderCreated")],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .append(
                vec![create_test_event(id2, Version::first(), "PaymentCreated")],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .append(
                vec![create_test_event(id1, Version::new(2), "OrderCreated")],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let created = store.get_events_by_type("OrderCreated").await.unwrap();
        assert_eq!(created.len(), 2);

        let payments = store.get_events_by_type("PaymentCreated").await.unwrap();
        assert_eq!(payments.len(), 1);
    }

    #[tokio::test]
    async fn stream_all_events_in_append_order() {
        use futures_util::StreamExt;

        let store = InMemoryEventStore::new();
        let id1 = AggregateId::new();
        let id2 = AggregateId::new();

        store
            .append(
                vec![create_test_event(id1, Version::first(), "Event1")],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .append(
                vec![create_test_event(id2, Version::first(), "Event2")],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let stream = store.stream_all_events().await.unwrap();
        let events: Vec<_> = stream.collect().await;
        let types: Vec<_> = events
            .into_iter()
            .map(|e| e.unwrap().event_type)
            .collect();
        assert_eq!(types, vec!["Event1", "Event2"]);
    }

    #[tokio::test]
    async fn get_aggregate_version() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let version = store.get_aggregate_version(aggregate_id).await.unwrap();
        assert!(version.is_none());

        let events = vec![
            create_test_event(aggregate_id, Version::new(1), "Event1"),
            create_test_event(aggregate_id, Version::new(2), "Event2"),
        ];
        store.append(events, AppendOptions::new()).await.unwrap();

        let version = store.get_aggregate_version(aggregate_id).await.unwrap();
        assert_eq!(version, Some(Version::new(2)));
    }

    async fn next_event_type(feed: &mut EventSubscription) -> String {
        match feed.next().await {
            Some(FeedItem::Event(event)) => event.event_type,
            other => panic!("expected an event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn subscribers_see_appends_in_order() {
        let store = InMemoryEventStore::new();
        let mut feed = store.subscribe();
        let id = AggregateId::new();

        store
            .append(
                vec![
                    create_test_event(id, Version::new(1), "Event1"),
                    create_test_event(id, Version::new(2), "Event2"),
                ],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        assert_eq!(next_event_type(&mut feed).await, "Event1");
        assert_eq!(next_event_type(&mut feed).await, "Event2");
    }

    #[tokio::test]
    async fn rejected_append_is_not_published() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(
                vec![create_test_event(id, Version::first(), "Event1")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        let mut feed = store.subscribe();
        let _ = store
            .append(
                vec![create_test_event(id, Version::new(2), "Rejected")],
                AppendOptions::expect_new(),
            )
            .await;
        store
            .append(
                vec![create_test_event(id, Version::new(2), "Event2")],
                AppendOptions::expect_version(Version::first()),
            )
            .await
            .unwrap();

        assert_eq!(next_event_type(&mut feed).await, "Event2");
    }
}
