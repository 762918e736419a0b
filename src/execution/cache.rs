//! Subtree Cache Module
//!
//! Caches the `ResultTable` produced by a Query Execution Tree node,
//! keyed by the operation's canonical `as_string()` representation so
//! that two differently-planned subtrees computing the same thing share
//! one cache entry.
//!
//! ## Design
//!
//! Bounded LRU with single-flight semantics: if two callers ask for the
//! same key while it is being built, the second blocks on the first's
//! result instead of recomputing it. Eviction only ever removes entries
//! that have finished building — an in-flight entry is never evicted out
//! from under its builder.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::EngineError;
use crate::result_table::ResultTable;

enum Slot {
    Building,
    Ready(Arc<ResultTable>),
}

struct Entry {
    slot: Slot,
    last_used: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    capacity: usize,
    clock: u64,
}

/// A bounded, single-flight cache from canonical subtree key to its
/// materialized `ResultTable`.
pub struct SubtreeCache {
    inner: Mutex<Inner>,
    condvar: Condvar,
}

/// Point-in-time counts, exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub ready_entries: usize,
    pub building_entries: usize,
    pub capacity: usize,
}

impl SubtreeCache {
    pub fn new(capacity: usize) -> Self {
        SubtreeCache {
            inner: Mutex::new(Inner { entries: HashMap::new(), capacity, clock: 0 }),
            condvar: Condvar::new(),
        }
    }

    /// Returns the cached table for `key` if one is ready, without
    /// triggering a build and without blocking on an in-flight build.
    pub fn lookup(&self, key: &str) -> Option<Arc<ResultTable>> {
        let mut inner = self.inner.lock();
        inner.clock += 1;
        let clock = inner.clock;
        match inner.entries.get_mut(key) {
            Some(entry) => match &entry.slot {
                Slot::Ready(table) => {
                    entry.last_used = clock;
                    Some(Arc::clone(table))
                }
                Slot::Building => None,
            },
            None => None,
        }
    }

    /// Returns the cached table for `key`, building it via `build` if
    /// absent. At most one caller runs `build` per key at a time; other
    /// callers for the same key block until that build finishes and then
    /// share its result (or its failure).
    pub fn get_or_build<F>(&self, key: &str, build: F) -> Result<Arc<ResultTable>, EngineError>
    where
        F: FnOnce() -> Result<ResultTable, EngineError>,
    {
        {
            let mut inner = self.inner.lock();
            loop {
                inner.clock += 1;
                let clock = inner.clock;
                match inner.entries.get_mut(key) {
                    Some(entry) => match &entry.slot {
                        Slot::Ready(table) => {
                            entry.last_used = clock;
                            return Ok(Arc::clone(table));
                        }
                        Slot::Building => {
                            self.condvar.wait(&mut inner);
                            continue;
                        }
                    },
                    None => {
                        inner.entries.insert(
                            key.to_string(),
                            Entry { slot: Slot::Building, last_used: clock },
                        );
                        break;
                    }
                }
            }
        }

        let result = build();

        let mut inner = self.inner.lock();
        match result {
            Ok(table) => {
                inner.clock += 1;
                let clock = inner.clock;
                let table = Arc::new(table);
                inner.entries.insert(
                    key.to_string(),
                    Entry { slot: Slot::Ready(Arc::clone(&table)), last_used: clock },
                );
                self.evict_if_over_capacity(&mut inner);
                drop(inner);
                self.condvar.notify_all();
                Ok(table)
            }
            Err(err) => {
                inner.entries.remove(key);
                drop(inner);
                self.condvar.notify_all();
                Err(err)
            }
        }
    }

    /// Removes all ready entries. In-flight builds are left untouched so
    /// their waiters still observe a result.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.retain(|_, entry| matches!(entry.slot, Slot::Building));
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut stats = CacheStats { capacity: inner.capacity, ..Default::default() };
        for entry in inner.entries.values() {
            match entry.slot {
                Slot::Ready(_) => stats.ready_entries += 1,
                Slot::Building => stats.building_entries += 1,
            }
        }
        stats
    }

    fn evict_if_over_capacity(&self, inner: &mut Inner) {
        loop {
            let ready_count = inner
                .entries
                .values()
                .filter(|e| matches!(e.slot, Slot::Ready(_)))
                .count();
            if ready_count <= inner.capacity {
                return;
            }
            let lru_key = inner
                .entries
                .iter()
                .filter(|(_, e)| matches!(e.slot, Slot::Ready(_)))
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            match lru_key {
                Some(key) => {
                    inner.entries.remove(&key);
                }
                None => return,
            }
        }
    }
}
