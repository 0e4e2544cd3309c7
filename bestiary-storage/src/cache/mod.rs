//! Expiring cache with namespace isolation and durable/volatile backends.
//!
//! Values are stored as JSON envelopes carrying their fetch time and TTL.
//! Expired entries are masked on read and only deleted by an explicit
//! [`ExpiringCache::purge_expired`] or [`ExpiringCache::clear_namespace`].
//!
//! # Backends
//!
//! [`ExpiringCache::open`] tries the durable [`LmdbStore`] once and falls
//! back to [`MemoryStore`] if it cannot be opened or refuses a test write.
//! [`ExpiringCache::backend_kind`] reports which one was picked.
//!
//! # Example
//!
//! ```ignore
//! let cache = ExpiringCache::open(CacheConfig::from(&settings.cache));
//! let opts = CacheOptions::in_namespace("poke");
//!
//! let read = cache
//!     .get_or_fetch("detail_25", &opts, || client.detail("25"))
//!     .await?;
//! if read.was_cache_hit() {
//!     tracing::debug!(age = ?read.staleness(Utc::now()), "served from cache");
//! }
//! ```

pub mod envelope;
pub mod expiring;
pub mod lmdb_backend;
pub mod memory_backend;
pub mod namespaced_key;
pub mod read_through;
pub mod traits;

pub use envelope::{CacheRead, Envelope};
pub use expiring::{CacheConfig, CacheOptions, ExpiringCache, DEFAULT_TTL};
pub use lmdb_backend::LmdbStore;
pub use memory_backend::MemoryStore;
pub use namespaced_key::{is_valid_namespace, NamespacedKey, DEFAULT_NAMESPACE, SEPARATOR};
pub use read_through::RecordFetcher;
pub use traits::{BackendKind, CacheStats, KvStore};
