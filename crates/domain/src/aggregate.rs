//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

use crate::command::Command;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// This is used for serialization and event store filtering.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates in an event-sourced system.
///
/// An aggregate is a cluster of domain objects that can be treated as a single unit.
/// The aggregate root ensures consistency of changes being made within the aggregate.
///
/// In event sourcing, aggregates:
/// - Are rebuilt by replaying events
/// - Turn a command into exactly one event, or reject it
/// - Apply events to update state (pure, deterministic)
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The commands this aggregate accepts.
    type Command: Command;

    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    ///
    /// Used for event store organization and routing.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    ///
    /// Returns None for a new, uninitialized aggregate.
    fn id(&self) -> Option<AggregateId>;

    /// Returns the current version of the aggregate.
    ///
    /// Version starts at 0 for a new aggregate and increments with each event.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the command handler after loading events.
    fn set_version(&mut self, version: Version);

    /// Validates a command against the current state.
    ///
    /// Must not mutate anything. The returned event only takes effect once the
    /// caller has persisted it and folded it in with [`Aggregate::apply`].
    fn handle(&self, command: &Self::Command) -> Result<Self::Event, Self::Error>;

    /// Applies an event to the aggregate, updating its state.
    ///
    /// This method must be pure and deterministic:
    /// - Given the same state and event, it must always produce the same new state
    /// - It must not have side effects
    /// - It must not fail (events represent facts that have happened)
    fn apply(&mut self, event: &Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events<'a>(&mut self, events: impl IntoIterator<Item = &'a Self::Event>)
    where
        Self::Event: 'a,
    {
        for event in events {
            self.apply(event);
        }
    }

    /// Folds an event history, oldest first, over the initial state.
    fn replay<'a>(events: impl IntoIterator<Item = &'a Self::Event>) -> Self
    where
        Self::Event: 'a,
    {
        let mut aggregate = Self::default();
        aggregate.apply_events(events);
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum CounterEvent {
        Opened { id: AggregateId },
        Incremented { by: i32 },
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Opened { .. } => "CounterOpened",
                CounterEvent::Incremented { .. } => "CounterIncremented",
            }
        }
    }

    struct Increment {
        id: AggregateId,
        by: i32,
    }

    impl Command for Increment {
        fn aggregate_id(&self) -> AggregateId {
            self.id
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Counter {
        id: Option<AggregateId>,
        value: i32,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("increment must be positive")]
    struct NotPositive;

    impl Aggregate for Counter {
        type Command = Increment;
        type Event = CounterEvent;
        type Error = NotPositive;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn handle(&self, command: &Increment) -> Result<CounterEvent, NotPositive> {
            if command.by <= 0 {
                return Err(NotPositive);
            }
            Ok(CounterEvent::Incremented { by: command.by })
        }

        fn apply(&mut self, event: &CounterEvent) {
            match event {
                CounterEvent::Opened { id } => self.id = Some(*id),
                CounterEvent::Incremented { by } => self.value += by,
            }
        }
    }

    #[test]
    fn replay_folds_in_order() {
        let id = AggregateId::new();
        let events = vec![
            CounterEvent::Opened { id },
            CounterEvent::Incremented { by: 2 },
            CounterEvent::Incremented { by: 40 },
        ];

        let counter = Counter::replay(&events);
        assert_eq!(counter.id(), Some(id));
        assert_eq!(counter.value, 42);
        assert_eq!(Counter::replay(&events), counter);
    }

    #[test]
    fn handle_does_not_touch_state() {
        let counter = Counter::default();
        let rejected = counter.handle(&Increment {
            id: AggregateId::new(),
            by: 0,
        });
        assert!(rejected.is_err());
        assert_eq!(counter, Counter::default());
    }

    #[test]
    fn domain_event_type() {
        assert_eq!(
            CounterEvent::Opened {
                id: AggregateId::new()
            }
            .event_type(),
            "CounterOpened"
        );
        assert_eq!(
            CounterEvent::Incremented { by: 1 }.event_type(),
            "CounterIncremented"
        );
    }
}
