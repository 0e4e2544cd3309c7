//! Property and scenario tests for the view-model operations and the
//! cache-backed record loading the client builds on.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use bestiary_client::view::{self, SortKey, SortOrder};
use bestiary_client::{fallback, RestClient};
use bestiary_storage::{CacheConfig, CacheOptions, ExpiringCache};
use bestiary_test_utils::assertions::{assert_names, assert_not_found};
use bestiary_test_utils::generators::{arb_creature_set, arb_type_name};
use bestiary_test_utils::{fixtures, CreatureDetail, CreatureSummary, ManualClock, Sprites};
use proptest::prelude::*;

fn refs(records: &[CreatureDetail]) -> Vec<&CreatureDetail> {
    records.iter().collect()
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_search_matches_name_id_and_type() {
    let records = fixtures::starter_dataset();

    assert_names(view::search(&records, "CHAR"), &["charmander", "charizard"]);
    assert_names(view::search(&records, "25"), &["pikachu"]);
    assert_names(view::search(&records, "poison"), &["bulbasaur", "gastly"]);
    assert_names(view::search(&records, "fly"), &["charizard"]);
    assert!(view::search(&records, "mewtwo").is_empty());
    assert_eq!(view::search(&records, "   ").len(), records.len());
}

#[test]
fn test_sort_by_each_key() {
    let records = fixtures::starter_dataset();
    let mut hits = refs(&records);

    view::sort(&mut hits, SortKey::Weight, SortOrder::Descending);
    let heaviest_first = ["charizard", "squirtle", "charmander", "bulbasaur", "pikachu", "gastly"];
    assert_names(hits.iter().copied(), &heaviest_first);

    view::sort(&mut hits, SortKey::BaseExperience, SortOrder::Ascending);
    assert_eq!(hits[0].name, "gastly");
    assert_eq!(hits.last().map(|r| r.name.as_str()), Some("charizard"));

    view::sort(&mut hits, SortKey::Name, SortOrder::Ascending);
    assert_eq!(hits[0].name, "bulbasaur");
    assert_eq!(hits[5].name, "squirtle");
}

#[test]
fn test_sort_ties_break_on_name_in_same_direction() {
    let records = vec![
        fixtures::creature(3, "c", &["fire"]),
        fixtures::creature(1, "a", &["fire"]),
        fixtures::creature(2, "b", &["fire"]),
    ];
    let mut hits = refs(&records);

    view::sort(&mut hits, SortKey::Height, SortOrder::Ascending);
    assert_names(hits.iter().copied(), &["a", "b", "c"]);

    view::sort(&mut hits, SortKey::Height, SortOrder::Descending);
    assert_names(hits.iter().copied(), &["c", "b", "a"]);
}

#[test]
fn test_filter_requires_every_type() {
    let records = fixtures::starter_dataset();
    let all = refs(&records);

    assert_names(view::filter_by_types(&all, &["fire", "flying"]), &["charizard"]);
    assert_names(view::filter_by_types(&all, &["fire"]), &["charmander", "charizard"]);
    assert_eq!(view::filter_by_types::<&str>(&all, &[]).len(), records.len());
    assert!(view::filter_by_types(&all, &["water", "fire"]).is_empty());
}

#[test]
fn test_select_combines_search_filter_and_sort() {
    let records = fixtures::starter_dataset();
    let hits = view::select(
        &records,
        "",
        &["poison"],
        SortKey::Id,
        SortOrder::Descending,
    );
    assert_names(hits, &["gastly", "bulbasaur"]);
}

#[test]
fn test_neighbours_for_detail_navigation() {
    let records = fixtures::starter_dataset();
    let all = refs(&records);

    let first = view::neighbours(&all, "bulbasaur").unwrap();
    assert_eq!(first.index, 0);
    assert_eq!(first.prev, None);
    assert_eq!(first.next.as_deref(), Some("charmander"));

    let by_id = view::neighbours(&all, "25").unwrap();
    assert_eq!(by_id.prev.as_deref(), Some("squirtle"));
    assert_eq!(by_id.next.as_deref(), Some("gastly"));

    let last = view::neighbours(&all, "Gastly").unwrap();
    assert_eq!(last.next, None);

    assert!(view::neighbours(&all, "mew").is_none());
}

#[test]
fn test_all_types_sorted_and_distinct() {
    let records = fixtures::starter_dataset();
    assert_eq!(
        view::all_types(&records),
        vec!["electric", "fire", "flying", "ghost", "grass", "poison", "water"]
    );
}

#[test]
fn test_display_image_fallbacks() {
    let mut record = fixtures::creature(133, "eevee", &["normal"]);
    assert_eq!(view::display_image(&record), "https://img.test/133.png");

    record.sprites.other.clear();
    assert_eq!(view::display_image(&record), "https://img.test/front/133.png");

    record.sprites = Sprites::default();
    assert_eq!(view::display_image(&record), view::artwork_url(133));
}

#[test]
fn test_offline_records_are_searchable() {
    let records = fallback::offline_records();
    assert_names(view::search(records, "electric"), &["pikachu"]);
    assert_eq!(
        view::all_types(records),
        vec!["electric", "fire", "grass", "poison", "water"]
    );
}

#[tokio::test]
async fn test_read_through_refetches_after_ttl() {
    let clock = ManualClock::default();
    let cache = ExpiringCache::volatile(CacheConfig::new().with_ttl(Duration::from_secs(60)))
        .with_clock(Arc::new(clock.clone()));
    let fetcher = fixtures::starter_fetcher();
    let opts = CacheOptions::in_namespace("poke");

    let first = cache
        .read_through::<CreatureDetail, _>("detail_pikachu", "pikachu", &opts, &fetcher)
        .await;
    assert!(first.unwrap().was_cache_miss());

    clock.advance(Duration::from_secs(59));
    let hit = cache
        .read_through::<CreatureDetail, _>("detail_pikachu", "pikachu", &opts, &fetcher)
        .await
        .unwrap();
    assert!(hit.was_cache_hit());
    assert_eq!(fetcher.calls(), 1);

    clock.advance(Duration::from_secs(2));
    let refetched = cache
        .read_through::<CreatureDetail, _>("detail_pikachu", "pikachu", &opts, &fetcher)
        .await
        .unwrap();
    assert!(refetched.was_cache_miss());
    assert_eq!(refetched.value().id, 25);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_read_through_does_not_cache_misses() {
    let cache = ExpiringCache::volatile(CacheConfig::default());
    let fetcher = fixtures::starter_fetcher();
    let opts = CacheOptions::in_namespace("poke");

    for _ in 0..2 {
        let result = cache
            .read_through::<CreatureDetail, _>("missingno", "missingno", &opts, &fetcher)
            .await
            .map(|read| read.into_value());
        assert_not_found(&result);
    }
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_rest_client_as_record_fetcher_reports_transport_errors() {
    let client =
        RestClient::with_base_url("http://127.0.0.1:1", Duration::from_millis(300)).unwrap();
    let cache = ExpiringCache::volatile(CacheConfig::default());
    let opts = CacheOptions::default();

    let result = cache
        .read_through::<CreatureDetail, _>("detail_pikachu", "pikachu", &opts, &client)
        .await;
    assert!(result.unwrap_err().is_transient());
    assert!(cache.get::<CreatureDetail>("detail_pikachu", &opts).is_none());
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn summaries(ids: &BTreeSet<u32>) -> Vec<CreatureSummary> {
    ids.iter()
        .rev()
        .map(|&id| CreatureSummary {
            id,
            name: format!("c{id}"),
            image: view::artwork_url(id),
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_empty_query_keeps_everything(records in arb_creature_set(20)) {
        prop_assert_eq!(view::search(&records, "").len(), records.len());
    }

    #[test]
    fn prop_select_hits_have_every_type_and_are_sorted(
        records in arb_creature_set(20),
        wanted in prop::collection::vec(arb_type_name(), 0..3),
    ) {
        let hits = view::select(&records, "", &wanted, SortKey::Id, SortOrder::Ascending);
        for hit in &hits {
            for t in &wanted {
                prop_assert!(hit.has_type(t));
            }
        }
        for pair in hits.windows(2) {
            prop_assert!(pair[0].id < pair[1].id);
        }
        let expected = records
            .iter()
            .filter(|r| wanted.iter().all(|t| r.has_type(t)))
            .count();
        prop_assert_eq!(hits.len(), expected);
    }

    #[test]
    fn prop_descending_id_is_reverse_of_ascending(records in arb_creature_set(20)) {
        let mut up = refs(&records);
        let mut down = refs(&records);
        view::sort(&mut up, SortKey::Id, SortOrder::Ascending);
        view::sort(&mut down, SortKey::Id, SortOrder::Descending);
        down.reverse();
        prop_assert_eq!(up, down);
    }

    #[test]
    fn prop_pages_cover_items_exactly_once(
        items in prop::collection::vec(any::<u16>(), 0..100),
        page_size in 1usize..30,
    ) {
        let first = view::paginate(&items, 1, page_size);
        let expected_pages = items.len().div_ceil(page_size).max(1);
        prop_assert_eq!(first.total_pages, expected_pages);

        let mut joined = Vec::new();
        for page in 1..=first.total_pages {
            let p = view::paginate(&items, page, page_size);
            prop_assert_eq!(p.can_prev, page > 1);
            prop_assert_eq!(p.can_next, page < expected_pages);
            prop_assert!(p.items.len() <= page_size);
            joined.extend(p.items);
        }
        prop_assert_eq!(joined, items);
    }

    #[test]
    fn prop_neighbours_are_adjacent(records in arb_creature_set(15)) {
        let all = refs(&records);
        for (i, record) in records.iter().enumerate() {
            let n = view::neighbours(&all, &record.name).unwrap();
            prop_assert_eq!(n.index, i);
            prop_assert_eq!(n.prev, i.checked_sub(1).map(|p| records[p].name.clone()));
            prop_assert_eq!(n.next, records.get(i + 1).map(|r| r.name.clone()));
        }
    }

    #[test]
    fn prop_intersection_is_shared_sorted_and_capped(
        a in prop::collection::btree_set(1u32..60, 0..30),
        b in prop::collection::btree_set(1u32..60, 0..30),
        cap in 0usize..40,
    ) {
        let shared = view::intersect_by_id(&[summaries(&a), summaries(&b)], cap);
        let expected: Vec<u32> = a.intersection(&b).copied().take(cap).collect();
        prop_assert_eq!(shared.iter().map(|s| s.id).collect::<Vec<_>>(), expected);
    }
}
