//! Store backend trait and cache statistics.
//!
//! This module defines the contract the expiring cache needs from a
//! key-value store, and the counters the cache keeps about its own use.

use bestiary_core::StoreError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Which kind of store backs a cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Survives process restarts.
    Durable,
    /// Lives and dies with the process.
    Volatile,
}

impl BackendKind {
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Durable)
    }
}

/// String key-value store used underneath the expiring cache.
///
/// Every method is synchronous: an operation runs to completion without
/// yielding, so logically concurrent callers on one scheduler never observe
/// a half-applied write. Implementations must still be `Send + Sync` so a
/// cache can be shared across a multi-threaded runtime.
///
/// # Error Handling
///
/// Implementations report failures as [`StoreError`]. The cache never
/// surfaces these to its callers; they are logged and turned into a miss or
/// a dropped write.
pub trait KvStore: Send + Sync {
    /// Read a raw value.
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a raw value, replacing any previous one.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value. Returns whether the key existed.
    fn remove_item(&self, key: &str) -> Result<bool, StoreError>;

    /// All keys that start with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Write then delete a throwaway key to prove the store accepts writes.
    fn check_writable(&self) -> Result<(), StoreError> {
        const CHECK_KEY: &str = "__cache_test__";
        self.set_item(CHECK_KEY, "1")?;
        self.remove_item(CHECK_KEY)?;
        Ok(())
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of reads that returned a fresh value.
    pub hits: u64,
    /// Number of reads that found nothing usable.
    pub misses: u64,
    /// Number of writes the store accepted.
    pub writes: u64,
    /// Number of writes the store rejected.
    pub dropped_writes: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free counters behind [`CacheStats`].
#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    dropped_writes: AtomicU64,
}

impl StatCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_write(&self) {
        self.dropped_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            dropped_writes: self.dropped_writes.load(Ordering::Relaxed),
        }
    }
}
