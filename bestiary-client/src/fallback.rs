//! Built-in records used when the catalog API is unreachable.

use std::collections::BTreeMap;

use bestiary_core::{
    AbilitySlot, Artwork, CreatureDetail, NamedResource, Sprites, StatValue, TypeSlot,
    OFFICIAL_ARTWORK,
};
use once_cell::sync::Lazy;

use crate::view::artwork_url;

/// Type names shown when the type index cannot be fetched.
pub const FALLBACK_TYPES: &[&str] = &["grass", "fire", "water", "electric", "ghost", "fairy"];

/// Names listed when the creature listing cannot be fetched.
pub const FALLBACK_NAMES: &[&str] = &["bulbasaur", "charmander", "squirtle"];

const STAT_NAMES: [&str; 6] = [
    "hp",
    "attack",
    "defense",
    "special-attack",
    "special-defense",
    "speed",
];

struct Seed {
    id: u32,
    name: &'static str,
    height: u32,
    weight: u32,
    base_experience: u32,
    types: &'static [&'static str],
    abilities: &'static [(&'static str, bool)],
    stats: [u32; 6],
}

const SEEDS: [Seed; 4] = [
    Seed {
        id: 1,
        name: "bulbasaur",
        height: 7,
        weight: 69,
        base_experience: 64,
        types: &["grass", "poison"],
        abilities: &[("overgrow", false)],
        stats: [45, 49, 49, 65, 65, 45],
    },
    Seed {
        id: 4,
        name: "charmander",
        height: 6,
        weight: 85,
        base_experience: 62,
        types: &["fire"],
        abilities: &[("blaze", false)],
        stats: [39, 52, 43, 60, 50, 65],
    },
    Seed {
        id: 7,
        name: "squirtle",
        height: 5,
        weight: 90,
        base_experience: 63,
        types: &["water"],
        abilities: &[("torrent", false)],
        stats: [44, 48, 65, 50, 64, 43],
    },
    Seed {
        id: 25,
        name: "pikachu",
        height: 4,
        weight: 60,
        base_experience: 112,
        types: &["electric"],
        abilities: &[("static", false), ("lightning-rod", true)],
        stats: [35, 55, 40, 50, 50, 90],
    },
];

static OFFLINE_RECORDS: Lazy<Vec<CreatureDetail>> = Lazy::new(|| SEEDS.iter().map(grow).collect());

fn grow(seed: &Seed) -> CreatureDetail {
    let mut other = BTreeMap::new();
    other.insert(
        OFFICIAL_ARTWORK.to_string(),
        Artwork {
            front_default: Some(artwork_url(seed.id)),
        },
    );

    CreatureDetail {
        id: seed.id,
        name: seed.name.to_string(),
        height: seed.height,
        weight: seed.weight,
        base_experience: Some(seed.base_experience),
        types: seed
            .types
            .iter()
            .zip(1u8..)
            .map(|(name, slot)| TypeSlot {
                slot,
                kind: NamedResource::new(*name, ""),
            })
            .collect(),
        abilities: seed
            .abilities
            .iter()
            .zip(1u8..)
            .map(|((name, is_hidden), slot)| AbilitySlot {
                ability: NamedResource::new(*name, ""),
                is_hidden: *is_hidden,
                slot,
            })
            .collect(),
        stats: STAT_NAMES
            .iter()
            .zip(seed.stats)
            .map(|(name, base_stat)| StatValue {
                base_stat,
                effort: None,
                stat: NamedResource::new(*name, ""),
            })
            .collect(),
        sprites: Sprites {
            front_default: None,
            other,
        },
    }
}

/// All offline records, sorted by id.
pub fn offline_records() -> &'static [CreatureDetail] {
    &OFFLINE_RECORDS
}

/// Offline record matching a name (case-insensitive) or numeric id.
pub fn offline_detail(id_or_name: &str) -> Option<CreatureDetail> {
    let key = id_or_name.trim().to_lowercase();
    let id = key.parse::<u32>().ok();
    OFFLINE_RECORDS
        .iter()
        .find(|r| r.name == key || Some(r.id) == id)
        .cloned()
}

/// Listing used when the real one cannot be fetched.
pub fn offline_names() -> Vec<NamedResource> {
    FALLBACK_NAMES
        .iter()
        .map(|name| NamedResource::new(*name, ""))
        .collect()
}

pub fn fallback_types() -> Vec<String> {
    FALLBACK_TYPES.iter().map(|t| t.to_string()).collect()
}
