pub mod error;
pub mod event;
pub mod feed;
pub mod memory;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use feed::{EventSubscription, FeedItem};
pub use memory::InMemoryEventStore;
pub use store::{AppendOptions, EventStore, EventStream};
