//! Namespaced key-value cache with per-entry time-to-live.
//!
//! The backing store is chosen once, when the cache is opened: the durable
//! LMDB store if it opens and accepts a test write, the volatile in-memory
//! store otherwise. The choice holds for the lifetime of the instance.
//!
//! No operation returns an error. Store failures are logged and read as a
//! miss, or count as a dropped write.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bestiary_core::{CacheSettings, Clock, StoreError, SystemClock};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, warn};

use super::envelope::{CacheRead, Envelope};
use super::lmdb_backend::LmdbStore;
use super::memory_backend::MemoryStore;
use super::namespaced_key::{is_valid_namespace, NamespacedKey, DEFAULT_NAMESPACE};
use super::traits::{BackendKind, CacheStats, KvStore, StatCounters};

/// Default entry lifetime: 7 days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Configuration for an expiring cache instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Namespace used when a call does not name one.
    pub namespace: String,
    /// TTL used when a write does not set one.
    pub ttl: Duration,
    /// Directory of the durable store. `None` means volatile only.
    pub durable_path: Option<PathBuf>,
    /// LMDB map size in megabytes.
    pub max_size_mb: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl: DEFAULT_TTL,
            durable_path: None,
            max_size_mb: 64,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_durable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.durable_path = Some(path.into());
        self
    }

    pub fn with_max_size_mb(mut self, max_size_mb: usize) -> Self {
        self.max_size_mb = max_size_mb;
        self
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            namespace: settings.namespace.clone(),
            ttl: settings.ttl(),
            durable_path: Some(settings.path.clone()),
            max_size_mb: settings.max_size_mb,
        }
    }
}

/// Per-call overrides of the cache defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    pub namespace: Option<String>,
    pub ttl: Option<Duration>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options targeting `namespace`.
    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Namespaced expiring cache.
///
/// # Example
///
/// ```ignore
/// let cache = ExpiringCache::open(CacheConfig::new().with_durable_path("/tmp/cache"));
/// cache.set("detail_25", &detail, &CacheOptions::in_namespace("poke"));
/// let hit: Option<CreatureDetail> = cache.get("detail_25", &CacheOptions::in_namespace("poke"));
/// ```
pub struct ExpiringCache {
    store: Box<dyn KvStore>,
    kind: BackendKind,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    stats: StatCounters,
}

impl ExpiringCache {
    /// Open a cache, probing the durable store once.
    ///
    /// Falls back to the volatile store when no durable path is configured,
    /// the store cannot be opened, or the test write fails.
    pub fn open(config: CacheConfig) -> Self {
        let Some(path) = config.durable_path.clone() else {
            return Self::volatile(config);
        };

        let opened = LmdbStore::open(&path, config.max_size_mb).and_then(|store| {
            store.check_writable()?;
            Ok(store)
        });

        match opened {
            Ok(store) => {
                debug!(path = %path.display(), "Using durable cache store");
                Self::with_store(store, BackendKind::Durable, config)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Durable cache store unavailable, falling back to memory"
                );
                Self::volatile(config)
            }
        }
    }

    /// A cache over a fresh in-memory store.
    pub fn volatile(config: CacheConfig) -> Self {
        Self::with_store(MemoryStore::new(), BackendKind::Volatile, config)
    }

    /// A cache over a caller-supplied store.
    pub fn with_store(
        store: impl KvStore + 'static,
        kind: BackendKind,
        config: CacheConfig,
    ) -> Self {
        Self {
            store: Box::new(store),
            kind,
            clock: Arc::new(SystemClock),
            config,
            stats: StatCounters::default(),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// The stored key for `key`, or `None` when the namespace is unusable.
    fn resolve_key(&self, key: &str, options: &CacheOptions) -> Option<NamespacedKey> {
        let namespace = options
            .namespace
            .as_deref()
            .unwrap_or(self.config.namespace.as_str());
        if !is_valid_namespace(namespace) {
            warn!(namespace, key, "Invalid cache namespace, ignoring operation");
            return None;
        }
        Some(NamespacedKey::new(namespace, key))
    }

    /// Look up an unexpired value. Misses, expired entries and unreadable
    /// entries all return `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, options: &CacheOptions) -> Option<T> {
        self.get_entry(key, options).map(CacheRead::into_value)
    }

    /// Like [`get`](Self::get), keeping the fetch timestamp.
    pub fn get_entry<T: DeserializeOwned>(
        &self,
        key: &str,
        options: &CacheOptions,
    ) -> Option<CacheRead<T>> {
        let Some(full_key) = self.resolve_key(key, options).map(|k| k.encode()) else {
            self.stats.record_miss();
            return None;
        };

        let raw = match self.store.get_item(&full_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.stats.record_miss();
                return None;
            }
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache read failed");
                self.stats.record_miss();
                return None;
            }
        };

        let envelope: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(key = %full_key, error = %e, "Ignoring unreadable cache entry");
                self.stats.record_miss();
                return None;
            }
        };

        if !envelope.is_fresh(self.clock.now_millis()) {
            debug!(key = %full_key, "Cache entry expired");
            self.stats.record_miss();
            return None;
        }

        self.stats.record_hit();
        let fetched_at = envelope.fetched_at();
        Some(CacheRead::from_cache(envelope.data, fetched_at))
    }

    /// Store `value`, stamped with the current time.
    ///
    /// A rejected write is logged and otherwise ignored.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, options: &CacheOptions) {
        self.write(key, value, options, self.clock.now_millis());
    }

    pub(crate) fn write<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: &CacheOptions,
        now_millis: i64,
    ) {
        let Some(full_key) = self.resolve_key(key, options).map(|k| k.encode()) else {
            self.stats.record_dropped_write();
            return;
        };
        let ttl = options.ttl.unwrap_or(self.config.ttl);

        let raw = match encode_entry(&full_key, value, now_millis, ttl) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Cache entry not serializable, dropping");
                self.stats.record_dropped_write();
                return;
            }
        };

        match self.store.set_item(&full_key, &raw) {
            Ok(()) => self.stats.record_write(),
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache write rejected, dropping");
                self.stats.record_dropped_write();
            }
        }
    }

    /// Delete one entry. Absent keys are fine.
    pub fn remove(&self, key: &str, options: &CacheOptions) {
        let Some(full_key) = self.resolve_key(key, options).map(|k| k.encode()) else {
            return;
        };
        if let Err(e) = self.store.remove_item(&full_key) {
            warn!(key = %full_key, error = %e, "Cache remove failed");
        }
    }

    /// Delete every entry of `namespace`. Returns how many were removed.
    pub fn clear_namespace(&self, namespace: &str) -> u64 {
        self.sweep(namespace, |_| true)
    }

    /// Delete the expired and unreadable entries of `namespace`.
    pub fn purge_expired(&self, namespace: &str) -> u64 {
        let now = self.clock.now_millis();
        self.sweep(namespace, |raw| {
            serde_json::from_str::<Envelope<IgnoredAny>>(raw)
                .map(|envelope| !envelope.is_fresh(now))
                .unwrap_or(true)
        })
    }

    fn sweep(&self, namespace: &str, should_remove: impl Fn(&str) -> bool) -> u64 {
        if !is_valid_namespace(namespace) {
            warn!(namespace, "Invalid cache namespace, nothing swept");
            return 0;
        }
        let prefix = NamespacedKey::namespace_prefix(namespace);
        let keys = match self.store.keys_with_prefix(&prefix) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(namespace, error = %e, "Cache namespace scan failed");
                return 0;
            }
        };

        let mut removed = 0u64;
        for key in keys {
            let doomed = match self.store.get_item(&key) {
                Ok(Some(raw)) => should_remove(&raw),
                Ok(None) => false,
                Err(_) => true,
            };
            if doomed && self.store.remove_item(&key).unwrap_or(false) {
                removed += 1;
            }
        }
        debug!(namespace, removed, "Cache namespace swept");
        removed
    }
}

/// Serialize `value` into its stored envelope.
fn encode_entry<T: Serialize + ?Sized>(
    key: &str,
    value: &T,
    now_millis: i64,
    ttl: Duration,
) -> Result<String, StoreError> {
    serde_json::to_string(&Envelope::new(value, now_millis, ttl)).map_err(|e| {
        StoreError::EncodeFailed {
            key: key.to_string(),
            reason: e.to_string(),
        }
    })
}
