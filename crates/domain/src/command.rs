//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new event.
    pub aggregate: A,

    /// The event that was generated and persisted.
    pub event: A::Event,

    /// The new version of the aggregate after the command.
    pub new_version: Version,
}

/// Trait for commands that can be executed against an aggregate.
///
/// Commands represent an intention to perform an action. They may be rejected
/// if the aggregate's current state doesn't allow the action.
pub trait Command: Send + Sync {
    /// Returns the ID of the aggregate this command targets.
    ///
    /// Creation commands generate this ID when they are constructed.
    fn aggregate_id(&self) -> AggregateId;

    /// Whether the target stream must already exist.
    fn requires_existing(&self) -> bool {
        true
    }
}

/// Handler for executing commands against aggregates.
///
/// The handler is responsible for:
/// 1. Loading the aggregate from the event store
/// 2. Asking the aggregate to turn the command into an event
/// 3. Persisting the event with optimistic concurrency
/// 4. Folding the persisted event into the returned aggregate
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate from the event store.
    ///
    /// If the aggregate doesn't exist, returns a default instance.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let envelopes = self.store.get_events_for_aggregate(aggregate_id).await?;

        let mut aggregate = A::default();
        for envelope in envelopes {
            let event: A::Event = envelope.decode()?;
            aggregate.apply(&event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        if aggregate.id().is_some() {
            Ok(Some(aggregate))
        } else {
            Ok(None)
        }
    }

    /// Executes a command and persists the resulting event.
    ///
    /// A rejected command appends nothing. The returned aggregate reflects the
    /// new event only after the append has succeeded.
    pub async fn execute(&self, command: A::Command) -> Result<CommandResult<A>, DomainError>
    where
        DomainError: From<A::Error>,
    {
        let aggregate_id = command.aggregate_id();
        let mut aggregate = self.load(aggregate_id).await?;
        let current_version = aggregate.version();

        if command.requires_existing() && aggregate.id().is_none() {
            return Err(DomainError::AggregateNotFound {
                aggregate_type: A::aggregate_type(),
                aggregate_id: aggregate_id.to_string(),
            });
        }

        let event = aggregate.handle(&command)?;

        let envelope = EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type(A::aggregate_type())
            .event_type(event.event_type())
            .version(current_version.next())
            .payload(&event)?
            .build()?;

        // Persist with optimistic concurrency
        let options = if current_version == Version::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_version(current_version)
        };

        let new_version = self.store.append(vec![envelope], options).await?;

        aggregate.apply(&event);
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            event,
            new_version,
        })
    }
}
