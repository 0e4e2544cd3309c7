//! Read-through access on top of [`ExpiringCache`].
//!
//! A read that misses calls the fetcher, stores what it returns, and hands
//! the value back tagged as a fetch. Failed fetches are never cached.

use std::future::Future;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::envelope::CacheRead;
use super::expiring::{CacheOptions, ExpiringCache};

/// Source of values for keys the cache does not hold.
///
/// This trait abstracts over where records actually come from (a REST API,
/// a fixture table), so the cache can fill itself from any of them.
#[async_trait]
pub trait RecordFetcher<T>: Send + Sync {
    type Error: Send;

    /// Fetch the record identified by `id`.
    async fn fetch(&self, id: &str) -> Result<T, Self::Error>;
}

impl ExpiringCache {
    /// Return the cached value for `key`, or run `fetch` and cache its result.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        options: &CacheOptions,
        fetch: F,
    ) -> Result<CacheRead<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get_entry::<T>(key, options) {
            return Ok(hit);
        }

        debug!(key, "Cache miss, fetching");
        let value = fetch().await?;
        let fetched_at = self.clock().now();
        self.write(key, &value, options, fetched_at.timestamp_millis());
        Ok(CacheRead::from_fetch(value, fetched_at))
    }

    /// [`get_or_fetch`](Self::get_or_fetch) driven by a [`RecordFetcher`].
    ///
    /// `key` names the cache entry; `id` is what the fetcher is asked for on
    /// a miss.
    pub async fn read_through<T, R>(
        &self,
        key: &str,
        id: &str,
        options: &CacheOptions,
        fetcher: &R,
    ) -> Result<CacheRead<T>, R::Error>
    where
        T: Serialize + DeserializeOwned,
        R: RecordFetcher<T> + ?Sized,
    {
        self.get_or_fetch(key, options, || fetcher.fetch(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::expiring::CacheConfig;
    use bestiary_core::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecordFetcher<String> for CountingFetcher {
        type Error = String;

        async fn fetch(&self, id: &str) -> Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if id == "missing" {
                Err(format!("{id} not found"))
            } else {
                Ok(format!("value-of-{id}"))
            }
        }
    }

    fn fetcher() -> CountingFetcher {
        CountingFetcher {
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_miss_fetches_then_hits() {
        let cache = ExpiringCache::volatile(CacheConfig::default());
        let fetcher = fetcher();
        let opts = CacheOptions::in_namespace("poke");

        let first = cache.read_through("item_a", "a", &opts, &fetcher).await.unwrap();
        assert!(first.was_cache_miss());
        assert_eq!(first.value(), "value-of-a");

        let second = cache.read_through("item_a", "a", &opts, &fetcher).await.unwrap();
        assert!(second.was_cache_hit());
        assert_eq!(second.into_value(), "value-of-a");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        // Stored under the cache key, fetched by the id.
        assert_eq!(cache.get::<String>("item_a", &opts).as_deref(), Some("value-of-a"));
        assert_eq!(cache.get::<String>("a", &opts), None);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache = ExpiringCache::volatile(CacheConfig::default());
        let fetcher = fetcher();
        let opts = CacheOptions::default();

        let err = cache
            .read_through("item_missing", "missing", &opts, &fetcher)
            .await
            .unwrap_err();
        assert_eq!(err, "missing not found");
        let again = cache.read_through("item_missing", "missing", &opts, &fetcher).await;
        assert!(again.is_err());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let clock = ManualClock::default();
        let cache = ExpiringCache::volatile(CacheConfig::default())
            .with_clock(Arc::new(clock.clone()));
        let fetcher = fetcher();
        let opts = CacheOptions::default().with_ttl(Duration::from_secs(10));

        cache.read_through("item_a", "a", &opts, &fetcher).await.unwrap();
        clock.advance(Duration::from_secs(11));
        let read = cache.read_through("item_a", "a", &opts, &fetcher).await.unwrap();

        assert!(read.was_cache_miss());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_get_or_fetch_with_closure() {
        let cache = ExpiringCache::volatile(CacheConfig::default());
        let opts = CacheOptions::default();

        let read: CacheRead<u32> = cache
            .get_or_fetch("n", &opts, || async { Ok::<_, ()>(42) })
            .await
            .unwrap();
        assert_eq!(*read.value(), 42);
        assert_eq!(cache.get::<u32>("n", &opts), Some(42));
    }
}
