//! Bestiary Core - Shared Types
//!
//! Errors, configuration, time sources and catalog record types. All other
//! crates depend on this one; it holds no I/O.

pub mod clock;
pub mod config;
pub mod error;
pub mod record;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    BestiaryConfig, CacheSettings, FetchSettings, SearchSettings, DEFAULT_API_BASE_URL,
    DEFAULT_CACHE_TTL_SECS, DEFAULT_CONCURRENCY, DEFAULT_DEBOUNCE_MS, DEFAULT_FETCH_LIMIT,
    DEFAULT_REQUEST_TIMEOUT_MS,
};
pub use error::{BestiaryError, BestiaryResult, ConfigError, FetchError, StoreError};
pub use record::{
    AbilitySlot, Artwork, CreatureDetail, CreatureSummary, NamedResource, ResourceList, Sprites,
    StatValue, TypeSlot, OFFICIAL_ARTWORK,
};
