//! Keyed memo table shared across requests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use tracing::debug;

/// A memoized value and when it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
}

/// Hit and miss counters since the memo was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
}

/// Concurrent map from canonical call keys to memoized results.
///
/// Lookups and writes lock a single shard for the duration of one map operation;
/// no lock is held while a fetch is awaited. Two callers missing the same key at
/// the same time both fetch, and whichever stores last wins.
#[derive(Debug)]
pub struct Memo<V> {
    entries: DashMap<String, CacheEntry<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> Default for Memo<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<V: Clone> Memo<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized value for `key`, or awaits `fetch` and stores its result.
    ///
    /// A failed fetch is returned as-is and leaves the table untouched.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cached = self.entries.get(key).map(|entry| entry.value.clone());
        if let Some(value) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key, "cache hit");
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key, "cache miss");
        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn insert(&self, key: &str, value: V) {
        self.entries.insert(
            key.to_owned(),
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Returns a copy of the entry under `key` without touching the counters.
    pub fn peek(&self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    /// Removes `key`. Returns `true` if an entry was present.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            debug!(key, "cache entry invalidated");
        }
        removed
    }

    /// Drops every entry. Counters are kept.
    pub fn flush(&self) {
        self.entries.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> MemoStats {
        MemoStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
