//! Stored entry format and read results.
//!
//! Every value is written wrapped in an [`Envelope`] that records when it was
//! fetched and how long it stays valid. Reads hand back a [`CacheRead`] that
//! tells the caller whether the value came from the cache or from a fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// On-disk shape of a cache entry.
///
/// Serialized as `{"data": .., "fetchedAt": <ms>, "ttl": <ms>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub data: T,
    /// Milliseconds since the Unix epoch.
    pub fetched_at: i64,
    /// Validity in milliseconds.
    pub ttl: u64,
}

impl<T> Envelope<T> {
    pub fn new(data: T, fetched_at: i64, ttl: Duration) -> Self {
        Self {
            data,
            fetched_at,
            ttl: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// True while `now - fetched_at < ttl`.
    ///
    /// A `fetched_at` in the future (clock moved backwards) counts as fresh.
    pub fn is_fresh(&self, now_millis: i64) -> bool {
        let age = i128::from(now_millis) - i128::from(self.fetched_at);
        age < i128::from(self.ttl)
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.fetched_at).unwrap_or_default()
    }
}

/// Result of a cache-or-fetch read, carrying where the value came from.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    /// When this value was fetched from its source.
    fetched_at: DateTime<Utc>,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// Create a new cache read from a cache hit.
    pub fn from_cache(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            value,
            fetched_at,
            was_cache_hit: true,
        }
    }

    /// Create a new cache read from a fresh fetch (cache miss).
    pub fn from_fetch(value: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            value,
            fetched_at,
            was_cache_hit: false,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// How long ago the value was fetched, as seen from `now`.
    pub fn staleness(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            fetched_at: self.fetched_at,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}
