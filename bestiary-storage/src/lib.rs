//! Bestiary Storage - Expiring Cache
//!
//! Namespaced key-value cache with per-entry TTL, kept in LMDB when it is
//! available and in process memory otherwise.

pub mod cache;

pub use cache::{
    BackendKind, CacheConfig, CacheOptions, CacheRead, CacheStats, ExpiringCache, KvStore,
    LmdbStore, MemoryStore, NamespacedKey, RecordFetcher, DEFAULT_NAMESPACE, DEFAULT_TTL,
};
