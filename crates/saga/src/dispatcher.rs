//! Routes stored events to the sagas they trigger.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use event_store::{EventEnvelope, EventStore, EventSubscription, FeedItem};
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use crate::definition::SagaDefinition;
use crate::error::Result;
use crate::runner::SagaRunner;

/// Reacts to one routed event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;
}

#[async_trait]
impl<S, D> EventHandler for SagaRunner<S, D>
where
    S: EventStore,
    D: SagaDefinition,
{
    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        self.run(event).await.map(|_| ())
    }
}

/// Explicit routing table from event type to handlers, built at startup.
#[derive(Default, Clone)]
pub struct SagaDispatcher {
    routes: HashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl SagaDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler for `event_type`. Handlers for the same type run in
    /// registration order.
    pub fn route(mut self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        self.routes.entry(event_type.into()).or_default().push(handler);
        self
    }

    /// Registers a runner under its definition's trigger event type.
    pub fn saga<S, D>(self, runner: Arc<SagaRunner<S, D>>) -> Self
    where
        S: EventStore + 'static,
        D: SagaDefinition,
    {
        let event_type = runner.definition().trigger_event_type();
        self.route(event_type, runner)
    }

    pub fn is_routed(&self, event_type: &str) -> bool {
        self.routes.contains_key(event_type)
    }

    /// Passes one event to every handler routed for its type.
    ///
    /// Returns the number of handlers that ran. Stops at the first error.
    pub async fn dispatch(&self, event: &EventEnvelope) -> Result<usize> {
        let Some(handlers) = self.routes.get(&event.event_type) else {
            return Ok(0);
        };
        for handler in handlers {
            handler.handle(event).await?;
        }
        Ok(handlers.len())
    }

    /// Replays the whole store through the routing table.
    ///
    /// Sagas that already started are reported as duplicates and do nothing,
    /// so this is safe to run on every startup. A saga whose trigger was
    /// recorded but which stopped mid-run is not resumed.
    #[tracing::instrument(skip_all)]
    pub async fn run_catch_up<S: EventStore + ?Sized>(&self, store: &S) -> Result<usize> {
        let mut events = store.stream_all_events().await?;
        let mut dispatched = 0;

        while let Some(event) = events.next().await {
            let event = event?;
            if !self.is_routed(&event.event_type) {
                continue;
            }
            match self.dispatch(&event).await {
                Ok(n) => dispatched += n,
                Err(e) => {
                    tracing::error!(event_id = %event.event_id, error = %e, "catch-up dispatch failed")
                }
            }
        }

        tracing::info!(dispatched, "saga catch-up finished");
        Ok(dispatched)
    }

    /// Dispatches every event from `feed` on its own task.
    ///
    /// Different keys run in parallel; single instance per key is up to the
    /// runners. When the feed reports dropped events, a catch-up over `store`
    /// runs before the next read; triggers it sees again come back as
    /// duplicates. The loop ends when the feed closes.
    pub fn spawn<S>(self: Arc<Self>, store: S, mut feed: EventSubscription) -> JoinHandle<()>
    where
        S: EventStore + 'static,
    {
        tokio::spawn(async move {
            while let Some(item) = feed.next().await {
                let event = match item {
                    FeedItem::Event(event) => event,
                    FeedItem::Lagged(skipped) => {
                        tracing::warn!(skipped, "event feed lagged, catching up from the store");
                        if let Err(e) = self.run_catch_up(&store).await {
                            tracing::error!(error = %e, "catch-up after feed lag failed");
                        }
                        continue;
                    }
                };
                if !self.is_routed(&event.event_type) {
                    continue;
                }
                let dispatcher = Arc::clone(&self);
                tokio::spawn(async move {
                    if let Err(e) = dispatcher.dispatch(&event).await {
                        tracing::error!(
                            event_id = %event.event_id,
                            event_type = %event.event_type,
                            error = %e,
                            "saga dispatch failed"
                        );
                    }
                });
            }
            tracing::info!("event feed closed, saga dispatcher stopped");
        })
    }
}
