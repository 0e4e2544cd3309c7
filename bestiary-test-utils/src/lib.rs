//! Bestiary Test Utilities
//!
//! Shared test infrastructure for the Bestiary workspace:
//! - Proptest generators for catalog records and configuration
//! - A mock record fetcher backed by an in-memory table
//! - Fixtures for common scenarios
//! - Assertions for catalog-specific checks

// Re-export the volatile store from its source crate
pub use bestiary_storage::MemoryStore;

// Re-export core types for convenience
pub use bestiary_core::{
    AbilitySlot, Artwork, BestiaryConfig, CreatureDetail, CreatureSummary, FetchError,
    ManualClock, NamedResource, ResourceList, Sprites, StatValue, TypeSlot, OFFICIAL_ARTWORK,
};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bestiary_storage::RecordFetcher;

// ============================================================================
// MOCK FETCHER
// ============================================================================

/// Record fetcher serving details from a fixed table.
///
/// Keys are matched by lowercase name or by numeric id. Every call is
/// counted, successful or not.
#[derive(Debug, Default)]
pub struct MockFetcher {
    records: Vec<CreatureDetail>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new(records: Vec<CreatureDetail>) -> Self {
        Self {
            records,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn lookup(&self, key: &str) -> Option<&CreatureDetail> {
        let key = key.trim().to_lowercase();
        let id = key.parse::<u32>().ok();
        self.records
            .iter()
            .find(|r| r.name == key || Some(r.id) == id)
    }
}

#[async_trait]
impl RecordFetcher<CreatureDetail> for MockFetcher {
    type Error = FetchError;

    async fn fetch(&self, id: &str) -> Result<CreatureDetail, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lookup(id).cloned().ok_or_else(|| FetchError::NotFound {
            resource: format!("pokemon/{id}"),
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for catalog types.

    use super::*;
    use proptest::prelude::*;

    /// Type names used by generated records.
    pub const TYPE_NAMES: &[&str] = &[
        "normal", "fire", "water", "grass", "electric", "ice", "fighting", "poison", "ground",
        "flying", "psychic", "bug", "rock", "ghost", "dragon", "dark", "steel", "fairy",
    ];

    /// Generate one known type name.
    pub fn arb_type_name() -> impl Strategy<Value = String> {
        prop::sample::select(TYPE_NAMES).prop_map(str::to_string)
    }

    /// Generate a lowercase creature name.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[a-z][a-z-]{2,11}"
    }

    /// Generate one or two distinct type names.
    pub fn arb_types() -> impl Strategy<Value = Vec<String>> {
        prop::sample::subsequence(TYPE_NAMES, 1..=2)
            .prop_map(|names| names.into_iter().map(str::to_string).collect())
    }

    /// Generate a creature with the given id.
    pub fn arb_creature_with_id(id: u32) -> impl Strategy<Value = CreatureDetail> {
        (
            arb_name(),
            arb_types(),
            1u32..200,
            1u32..10_000,
            prop::option::of(1u32..400),
            prop::array::uniform6(1u32..256),
        )
            .prop_map(move |(name, types, height, weight, base_experience, stats)| {
                let types: Vec<&str> = types.iter().map(String::as_str).collect();
                let mut detail = fixtures::creature(id, &name, &types);
                detail.height = height;
                detail.weight = weight;
                detail.base_experience = base_experience;
                detail.stats = fixtures::stats(stats);
                detail
            })
    }

    /// Generate a creature with any id in the catalog range.
    pub fn arb_creature() -> impl Strategy<Value = CreatureDetail> {
        (1u32..1026).prop_flat_map(arb_creature_with_id)
    }

    /// Generate up to `max` creatures with distinct ids and names.
    pub fn arb_creature_set(max: usize) -> impl Strategy<Value = Vec<CreatureDetail>> {
        prop::collection::btree_set(1u32..1026, 0..=max).prop_flat_map(|ids| {
            ids.into_iter()
                .map(arb_creature_with_id)
                .collect::<Vec<_>>()
                .prop_map(|mut records| {
                    // Suffix with the id so generated names never collide.
                    for record in &mut records {
                        record.name = format!("{}-{}", record.name, record.id);
                    }
                    records
                })
        })
    }

    /// Generate a configuration that passes validation.
    pub fn arb_valid_config() -> impl Strategy<Value = BestiaryConfig> {
        (
            1u64..120_000,
            "[a-z]{1,8}",
            1u64..10_000_000,
            1usize..1024,
            1usize..1000,
            1usize..64,
            any::<bool>(),
            0u64..2000,
            1usize..100,
        )
            .prop_map(
                |(
                    timeout_ms,
                    namespace,
                    ttl_secs,
                    max_size_mb,
                    limit,
                    concurrency,
                    continue_on_error,
                    debounce_ms,
                    page_size,
                )| {
                    let mut config = BestiaryConfig::default();
                    config.request_timeout_ms = timeout_ms;
                    config.cache.namespace = namespace;
                    config.cache.ttl_secs = ttl_secs;
                    config.cache.max_size_mb = max_size_mb;
                    config.fetch.limit = limit;
                    config.fetch.concurrency = concurrency;
                    config.fetch.continue_on_error = continue_on_error;
                    config.search.debounce_ms = debounce_ms;
                    config.search.page_size = page_size;
                    config
                },
            )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common testing scenarios.

    use super::*;

    const API_BASE: &str = "https://pokeapi.co/api/v2";

    const STAT_NAMES: [&str; 6] = [
        "hp",
        "attack",
        "defense",
        "special-attack",
        "special-defense",
        "speed",
    ];

    /// Listing entry with an id-bearing URL.
    pub fn resource(id: u32, name: &str) -> NamedResource {
        NamedResource::new(name, format!("{API_BASE}/pokemon/{id}/"))
    }

    /// Six base stats in the usual order.
    pub fn stats(values: [u32; 6]) -> Vec<StatValue> {
        STAT_NAMES
            .iter()
            .zip(values)
            .map(|(name, base_stat)| StatValue {
                base_stat,
                effort: Some(0),
                stat: NamedResource::new(*name, format!("{API_BASE}/stat/{name}/")),
            })
            .collect()
    }

    /// A minimal creature with official artwork and flat stats.
    pub fn creature(id: u32, name: &str, types: &[&str]) -> CreatureDetail {
        let mut other = BTreeMap::new();
        other.insert(
            OFFICIAL_ARTWORK.to_string(),
            Artwork {
                front_default: Some(format!("https://img.test/{id}.png")),
            },
        );

        CreatureDetail {
            id,
            name: name.to_string(),
            height: 10,
            weight: 100,
            base_experience: Some(100),
            types: types
                .iter()
                .zip(1u8..)
                .map(|(t, slot)| TypeSlot {
                    slot,
                    kind: NamedResource::new(*t, format!("{API_BASE}/type/{t}/")),
                })
                .collect(),
            abilities: vec![AbilitySlot {
                ability: NamedResource::new("run-away", ""),
                is_hidden: false,
                slot: 1,
            }],
            stats: stats([50; 6]),
            sprites: Sprites {
                front_default: Some(format!("https://img.test/front/{id}.png")),
                other,
            },
        }
    }

    /// A small dataset with distinct heights, weights and experience.
    ///
    /// Ids: 1 bulbasaur, 4 charmander, 6 charizard, 7 squirtle, 25 pikachu,
    /// 92 gastly (no base experience).
    pub fn starter_dataset() -> Vec<CreatureDetail> {
        let rows: [(u32, &str, &[&str], u32, u32, Option<u32>); 6] = [
            (1, "bulbasaur", &["grass", "poison"], 7, 69, Some(64)),
            (4, "charmander", &["fire"], 6, 85, Some(62)),
            (6, "charizard", &["fire", "flying"], 17, 905, Some(267)),
            (7, "squirtle", &["water"], 5, 90, Some(63)),
            (25, "pikachu", &["electric"], 4, 60, Some(112)),
            (92, "gastly", &["ghost", "poison"], 13, 1, None),
        ];
        rows.iter()
            .map(|(id, name, types, height, weight, exp)| {
                let mut detail = creature(*id, name, types);
                detail.height = *height;
                detail.weight = *weight;
                detail.base_experience = *exp;
                detail
            })
            .collect()
    }

    /// Listing page for `records`, without pagination links.
    pub fn listing(records: &[CreatureDetail]) -> ResourceList {
        ResourceList {
            count: records.len() as u32,
            next: None,
            previous: None,
            results: records.iter().map(|r| resource(r.id, &r.name)).collect(),
        }
    }

    /// Mock fetcher serving [`starter_dataset`].
    pub fn starter_fetcher() -> MockFetcher {
        MockFetcher::new(starter_dataset())
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for catalog-specific validation.

    use super::*;

    /// Assert that records are in strictly increasing id order.
    #[track_caller]
    pub fn assert_sorted_by_id(records: &[CreatureDetail]) {
        for pair in records.windows(2) {
            assert!(
                pair[0].id < pair[1].id,
                "Expected ids in increasing order, got {} before {}",
                pair[0].id,
                pair[1].id
            );
        }
    }

    /// Assert that a result is a NotFound fetch error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &Result<T, FetchError>) {
        match result {
            Err(FetchError::NotFound { .. }) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    /// Assert that the names of `records` equal `expected`, in order.
    #[track_caller]
    pub fn assert_names<'a, I>(records: I, expected: &[&str])
    where
        I: IntoIterator<Item = &'a CreatureDetail>,
    {
        let names: Vec<&str> = records.into_iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, expected);
    }
}
