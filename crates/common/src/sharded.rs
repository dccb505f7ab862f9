//! Key-scoped shared map.
//!
//! Keys are spread across a fixed number of independently locked shards, so
//! read-modify-write on one key never blocks work on keys in other shards.
//! Every operation that inspects and then mutates an entry does so while
//! holding that key's shard lock.

use std::collections::HashMap;
use std::collections::hash_map::{Entry, RandomState};
use std::hash::{BuildHasher, Hash};
use std::sync::{Mutex, MutexGuard, PoisonError};

const DEFAULT_SHARDS: usize = 16;

/// A concurrent map with explicit per-shard locking.
#[derive(Debug)]
pub struct ShardedMap<K, V> {
    shards: Box<[Mutex<HashMap<K, V>>]>,
    hasher: RandomState,
}

impl<K: Eq + Hash, V> ShardedMap<K, V> {
    /// Creates a map with the default shard count.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Creates a map with `count` shards (at least one).
    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    fn shard(&self, key: &K) -> MutexGuard<'_, HashMap<K, V>> {
        let index = (self.hasher.hash_one(key) as usize) % self.shards.len();
        // A panic while holding the lock cannot leave a HashMap half-updated
        // from our point of view, so a poisoned shard is still usable.
        self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `value` only if `key` is vacant.
    ///
    /// Returns the value back as `Err` when the key is already occupied.
    pub fn insert_if_absent(&self, key: K, value: V) -> Result<(), V> {
        match self.shard(&key).entry(key) {
            Entry::Occupied(_) => Err(value),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    /// Removes and returns the entry for `key`.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.shard(key).remove(key)
    }

    /// Removes the entry for `key` only if `predicate` accepts it.
    pub fn remove_if(&self, key: &K, predicate: impl FnOnce(&V) -> bool) -> Option<V> {
        let mut shard = self.shard(key);
        match shard.get(key) {
            Some(value) if predicate(value) => shard.remove(key),
            _ => None,
        }
    }

    /// Returns true if `key` has an entry.
    pub fn contains_key(&self, key: &K) -> bool {
        self.shard(key).contains_key(key)
    }

    /// Total number of entries across all shards.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// Returns true if no shard holds an entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry, shard by shard.
    pub fn drain(&self) -> Vec<(K, V)> {
        self.shards
            .iter()
            .flat_map(|s| {
                s.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .drain()
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl<K: Eq + Hash, V> Default for ShardedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn insert_if_absent_rejects_occupied_key() {
        let map = ShardedMap::new();
        assert!(map.insert_if_absent("a", 1).is_ok());
        assert_eq!(map.insert_if_absent("a", 2), Err(2));
        assert_eq!(map.remove(&"a"), Some(1));
        assert!(map.is_empty());
    }

    #[test]
    fn remove_if_checks_predicate_under_lock() {
        let map = ShardedMap::new();
        map.insert_if_absent("k", 7).unwrap();
        assert_eq!(map.remove_if(&"k", |v| *v == 8), None);
        assert!(map.contains_key(&"k"));
        assert_eq!(map.remove_if(&"k", |v| *v == 7), Some(7));
        assert!(!map.contains_key(&"k"));
    }

    #[test]
    fn single_shard_still_works() {
        let map = ShardedMap::with_shards(0);
        for i in 0..10 {
            map.insert_if_absent(i, i * 2).unwrap();
        }
        assert_eq!(map.len(), 10);
        let mut drained = map.drain();
        drained.sort();
        assert_eq!(drained.first(), Some(&(0, 0)));
        assert!(map.is_empty());
    }

    #[test]
    fn concurrent_claims_for_one_key_admit_exactly_one() {
        let map = Arc::new(ShardedMap::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let map = Arc::clone(&map);
                std::thread::spawn(move || map.insert_if_absent("order-1", i).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(map.len(), 1);
    }
}
