//! Cache artifact schema shared by the fetch and partition stages

use serde::{Deserialize, Deserializer, Serialize};

/// One game in the catalog, as stored in the cache artifact and bucket files.
///
/// Optional scalars serialize as `null`; sequences default to empty when a
/// document omits them.
///
/// # Examples
///
/// ```rust
/// use igdb_cache_common::GameRecord;
///
/// let game = GameRecord::new(1942, "The Witcher 3: Wild Hunt");
/// assert_eq!(game.igdb_id, 1942);
/// assert!(game.external_ids.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// IGDB game id, unique across the catalog
    pub igdb_id: i64,

    /// Display name; empty when IGDB has none
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub genres: Vec<String>,

    #[serde(default)]
    pub developers: Vec<String>,

    #[serde(default)]
    pub publishers: Vec<String>,

    /// Critic score, 0-100
    #[serde(default)]
    pub aggregated_rating: Option<f64>,

    /// First release date as a Unix timestamp
    #[serde(default)]
    pub release_date: Option<i64>,

    #[serde(default)]
    pub platforms: Vec<String>,

    #[serde(default)]
    pub cover_url: Option<String>,

    #[serde(default)]
    pub external_ids: Vec<ExternalId>,
}

impl GameRecord {
    /// Create a record with only an id and a name
    pub fn new(igdb_id: i64, name: impl Into<String>) -> Self {
        Self {
            igdb_id,
            name: name.into(),
            summary: None,
            genres: Vec::new(),
            developers: Vec::new(),
            publishers: Vec::new(),
            aggregated_rating: None,
            release_date: None,
            platforms: Vec::new(),
            cover_url: None,
            external_ids: Vec::new(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A store listing for a game (Steam app id, GOG id, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalId {
    /// IGDB external game category
    pub category: i32,

    /// Store name derived from `category`
    pub store: String,

    #[serde(default)]
    pub uid: Option<String>,

    #[serde(default)]
    pub url: Option<String>,
}

impl ExternalId {
    /// Build an entry, deriving the store name from the category
    pub fn new(category: i32, uid: Option<String>, url: Option<String>) -> Self {
        Self {
            category,
            store: store_name(category),
            uid,
            url,
        }
    }
}

/// Map an IGDB external game category to a store name.
///
/// Unknown categories become `store_<category>`.
pub fn store_name(category: i32) -> String {
    let known = match category {
        1 => "steam",
        5 => "gog",
        11 => "android",
        12 => "ios",
        13 => "microsoft",
        14 => "playstation",
        15 => "xbox",
        20 => "twitch",
        23 => "amazon",
        26 => "epic",
        28 => "oculus",
        30 => "itch",
        other => return format!("store_{}", other),
    };
    known.to_string()
}
