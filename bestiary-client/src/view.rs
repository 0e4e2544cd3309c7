//! View-model operations over loaded records.
//!
//! Pure functions: searching, sorting, type filtering, pagination and the
//! small formatting helpers the list and detail screens need.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use bestiary_core::{CreatureDetail, CreatureSummary, NamedResource};
use once_cell::sync::Lazy;
use regex::Regex;

const ARTWORK_BASE: &str = concat!(
    "https://raw.githubusercontent.com/PokeAPI/sprites/master",
    "/sprites/pokemon/other/official-artwork"
);

/// Base stat shown as a full bar.
pub const STAT_BAR_MAX: u32 = 160;

static CREATURE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/pokemon/(\d+)/?$").expect("Invalid creature URL regex"));

/// Official artwork URL for a creature id.
pub fn artwork_url(id: u32) -> String {
    format!("{ARTWORK_BASE}/{id}.png")
}

/// Creature id at the end of a resource URL such as `.../pokemon/25/`.
pub fn id_from_url(url: &str) -> Option<u32> {
    CREATURE_URL
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// List entry for a resource, if its URL carries an id.
pub fn summarize(resource: &NamedResource) -> Option<CreatureSummary> {
    let id = id_from_url(&resource.url)?;
    Some(CreatureSummary {
        id,
        name: resource.name.clone(),
        image: artwork_url(id),
    })
}

/// Image to show for a record: official artwork, then front sprite, then
/// the artwork URL derived from the id.
pub fn display_image(detail: &CreatureDetail) -> String {
    detail
        .image()
        .map(str::to_string)
        .unwrap_or_else(|| artwork_url(detail.id))
}

/// Width of a stat bar in percent.
pub fn stat_bar_percent(value: u32) -> f64 {
    (f64::from(value) / f64::from(STAT_BAR_MAX) * 100.0).min(100.0)
}

/// `#001` style id label.
pub fn padded_id(id: u32) -> String {
    format!("#{id:03}")
}

/// Case-insensitive search on name substring, exact id, or type substring.
///
/// An empty (or blank) query keeps every record.
pub fn search<'a>(records: &'a [CreatureDetail], query: &str) -> Vec<&'a CreatureDetail> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|r| {
            r.name.to_lowercase().contains(&q)
                || r.id.to_string() == q
                || r.type_names().any(|t| t.to_lowercase().contains(&q))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    #[default]
    Id,
    Name,
    Height,
    Weight,
    BaseExperience,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "height" => Ok(Self::Height),
            "weight" => Ok(Self::Weight),
            "base_experience" | "exp" => Ok(Self::BaseExperience),
            other => Err(format!(
                "unknown sort key '{other}' (expected id, name, height, weight, base_experience)"
            )),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Height => "height",
            Self::Weight => "weight",
            Self::BaseExperience => "base_experience",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Sort by `key`; ties fall back to the name, in the same direction.
///
/// Records without a base experience sort before those with one.
pub fn sort(records: &mut [&CreatureDetail], key: SortKey, order: SortOrder) {
    records.sort_by(|a, b| {
        let primary = match key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Height => a.height.cmp(&b.height),
            SortKey::Weight => a.weight.cmp(&b.weight),
            SortKey::BaseExperience => a.base_experience.cmp(&b.base_experience),
        };
        order.apply(primary.then_with(|| a.name.cmp(&b.name)))
    });
}

/// Keep records having every one of `selected` types.
pub fn filter_by_types<'a, S: AsRef<str>>(
    records: &[&'a CreatureDetail],
    selected: &[S],
) -> Vec<&'a CreatureDetail> {
    records
        .iter()
        .copied()
        .filter(|r| selected.iter().all(|t| r.has_type(t.as_ref())))
        .collect()
}

/// Search, then type filter, then sort: what a results screen shows.
pub fn select<'a, S: AsRef<str>>(
    records: &'a [CreatureDetail],
    query: &str,
    types: &[S],
    key: SortKey,
    order: SortOrder,
) -> Vec<&'a CreatureDetail> {
    let mut hits = filter_by_types(&search(records, query), types);
    sort(&mut hits, key, order);
    hits
}

/// Entries present in every list, sorted by id, at most `cap` of them.
///
/// The first occurrence of an id supplies its entry. No lists means no
/// entries.
pub fn intersect_by_id(lists: &[Vec<CreatureSummary>], cap: usize) -> Vec<CreatureSummary> {
    let Some((first, rest)) = lists.split_first() else {
        return Vec::new();
    };

    let rest_ids: Vec<BTreeSet<u32>> = rest
        .iter()
        .map(|list| list.iter().map(|s| s.id).collect())
        .collect();

    let mut shared: BTreeMap<u32, &CreatureSummary> = BTreeMap::new();
    for summary in first {
        if rest_ids.iter().all(|ids| ids.contains(&summary.id)) {
            shared.entry(summary.id).or_insert(summary);
        }
    }

    shared.into_values().take(cap).cloned().collect()
}

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number, clamped into range.
    pub page: usize,
    /// Never less than 1.
    pub total_pages: usize,
    pub total_items: usize,
    pub can_prev: bool,
    pub can_next: bool,
}

/// Slice out page `page` (1-based) of `page_size` items.
///
/// Out-of-range pages clamp to the first or last page. A zero page size is
/// treated as 1.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);

    Page {
        items: items[start.min(total_items)..end].to_vec(),
        page,
        total_pages,
        total_items,
        can_prev: page > 1,
        can_next: page < total_pages,
    }
}

/// Position of a record in a list plus its neighbours' names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbours {
    pub index: usize,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// Locate `id_or_name` (name first, then numeric id) in `records`.
pub fn neighbours(records: &[&CreatureDetail], id_or_name: &str) -> Option<Neighbours> {
    let key = id_or_name.trim().to_lowercase();
    let index = records.iter().position(|r| r.name == key).or_else(|| {
        let id = key.parse::<u32>().ok()?;
        records.iter().position(|r| r.id == id)
    })?;

    Some(Neighbours {
        index,
        prev: index
            .checked_sub(1)
            .and_then(|i| records.get(i))
            .map(|r| r.name.clone()),
        next: records.get(index + 1).map(|r| r.name.clone()),
    })
}

/// Sorted distinct type names across `records`.
pub fn all_types(records: &[CreatureDetail]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.type_names())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_url() {
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/25/"), Some(25));
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/151"), Some(151));
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon-species/25/"), None);
        assert_eq!(id_from_url(""), None);
    }

    #[test]
    fn test_summarize_requires_id() {
        let with_id = NamedResource::new("pikachu", "https://pokeapi.co/api/v2/pokemon/25/");
        let summary = summarize(&with_id).unwrap();
        assert_eq!(summary.id, 25);
        assert!(summary.image.ends_with("/25.png"));

        assert!(summarize(&NamedResource::new("bulbasaur", "")).is_none());
    }

    #[test]
    fn test_formatting_helpers() {
        assert_eq!(padded_id(1), "#001");
        assert_eq!(padded_id(25), "#025");
        assert_eq!(padded_id(1010), "#1010");

        assert!((stat_bar_percent(80) - 50.0).abs() < 1e-9);
        assert!((stat_bar_percent(255) - 100.0).abs() < 1e-9);
        assert!((stat_bar_percent(0)).abs() < 1e-9);
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("Weight".parse::<SortKey>(), Ok(SortKey::Weight));
        assert_eq!("base-experience".parse::<SortKey>(), Ok(SortKey::BaseExperience));
        assert!("speed".parse::<SortKey>().is_err());
        assert_eq!(SortKey::BaseExperience.to_string(), "base_experience");
    }

    #[test]
    fn test_paginate_clamps() {
        let items: Vec<u32> = (1..=10).collect();

        let first = paginate(&items, 1, 4);
        assert_eq!(first.items, vec![1, 2, 3, 4]);
        assert_eq!(first.total_pages, 3);
        assert!(!first.can_prev);
        assert!(first.can_next);

        let last = paginate(&items, 99, 4);
        assert_eq!(last.page, 3);
        assert_eq!(last.items, vec![9, 10]);
        assert!(last.can_prev);
        assert!(!last.can_next);

        let zero = paginate(&items, 0, 4);
        assert_eq!(zero.page, 1);
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate::<u32>(&[], 3, 24);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
        assert!(!page.can_prev && !page.can_next);
    }

    fn summary(id: u32, name: &str) -> CreatureSummary {
        CreatureSummary {
            id,
            name: name.to_string(),
            image: artwork_url(id),
        }
    }

    #[test]
    fn test_intersect_by_id() {
        let grass = vec![summary(3, "venusaur"), summary(1, "bulbasaur"), summary(2, "ivysaur")];
        let poison = vec![summary(2, "ivysaur"), summary(1, "bulbasaur"), summary(23, "ekans")];

        let both = intersect_by_id(&[grass.clone(), poison], 10);
        assert_eq!(
            both.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let capped = intersect_by_id(&[grass.clone()], 2);
        assert_eq!(capped.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2]);

        assert!(intersect_by_id(&[], 10).is_empty());
        assert!(intersect_by_id(&[grass, Vec::new()], 10).is_empty());
    }
}
