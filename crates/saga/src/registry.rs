//! In-process registry of active saga instances.

use std::sync::Arc;
use std::time::Instant;

use common::{AggregateId, ShardedMap};

#[derive(Debug)]
struct ActiveSaga {
    saga_id: AggregateId,
    claimed_at: Instant,
}

/// Tracks which association keys have a saga running in this process.
///
/// A claim is taken before any saga event is written and released when the
/// returned [`SagaClaim`] is dropped, whether the run finished, failed or
/// panicked.
#[derive(Debug, Clone, Default)]
pub struct SagaRegistry {
    active: Arc<ShardedMap<AggregateId, ActiveSaga>>,
}

impl SagaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key` for `saga_id`. Returns `None` if another run holds it.
    pub fn claim(&self, key: AggregateId, saga_id: AggregateId) -> Option<SagaClaim> {
        let entry = ActiveSaga {
            saga_id,
            claimed_at: Instant::now(),
        };
        if self.active.insert_if_absent(key, entry).is_err() {
            return None;
        }
        metrics::gauge!("saga_active").increment(1.0);
        Some(SagaClaim {
            active: Arc::clone(&self.active),
            key,
        })
    }

    pub fn is_active(&self, key: AggregateId) -> bool {
        self.active.contains_key(&key)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

/// Exclusive right to run the saga for one association key.
#[derive(Debug)]
pub struct SagaClaim {
    active: Arc<ShardedMap<AggregateId, ActiveSaga>>,
    key: AggregateId,
}

impl SagaClaim {
    pub fn key(&self) -> AggregateId {
        self.key
    }
}

impl Drop for SagaClaim {
    fn drop(&mut self) {
        if let Some(entry) = self.active.remove(&self.key) {
            metrics::gauge!("saga_active").decrement(1.0);
            tracing::debug!(
                key = %self.key,
                saga_id = %entry.saga_id,
                held_for = ?entry.claimed_at.elapsed(),
                "saga claim released"
            );
        }
    }
}
