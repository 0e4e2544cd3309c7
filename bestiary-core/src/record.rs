//! Catalog record types.
//!
//! These mirror the catalog API payloads. Unknown fields are ignored so the
//! types keep deserializing when the API grows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the official artwork entry under `sprites.other`.
pub const OFFICIAL_ARTWORK: &str = "official-artwork";

/// A `{ name, url }` reference to another API resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl NamedResource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceList {
    pub count: u32,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<NamedResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    pub slot: u8,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
    pub is_hidden: bool,
    pub slot: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatValue {
    pub base_stat: u32,
    #[serde(default)]
    pub effort: Option<u32>,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    #[serde(default)]
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprites {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default)]
    pub other: BTreeMap<String, Artwork>,
}

/// Full detail payload for one creature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureDetail {
    pub id: u32,
    pub name: String,
    pub height: u32,
    pub weight: u32,
    #[serde(default)]
    pub base_experience: Option<u32>,
    pub types: Vec<TypeSlot>,
    pub abilities: Vec<AbilitySlot>,
    pub stats: Vec<StatValue>,
    #[serde(default)]
    pub sprites: Sprites,
}

impl CreatureDetail {
    /// Official artwork if present, otherwise the default front sprite.
    pub fn image(&self) -> Option<&str> {
        self.sprites
            .other
            .get(OFFICIAL_ARTWORK)
            .and_then(|art| art.front_default.as_deref())
            .or(self.sprites.front_default.as_deref())
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|slot| slot.kind.name.as_str())
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.type_names().any(|t| t == name)
    }

    pub fn stat(&self, name: &str) -> Option<u32> {
        self.stats
            .iter()
            .find(|s| s.stat.name == name)
            .map(|s| s.base_stat)
    }
}

/// A list entry with its id resolved from the resource URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreatureSummary {
    pub id: u32,
    pub name: String,
    pub image: String,
}
