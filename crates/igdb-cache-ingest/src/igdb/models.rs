// IGDB response schemas
//
// Every field IGDB may omit is optional here; nothing untyped leaves this
// module. `RawGame::into_record` is the only way raw data becomes a GameRecord.

use igdb_cache_common::{ExternalId, GameRecord};
use serde::Deserialize;
use std::collections::HashMap;

/// Any expanded reference that only contributes its name
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: Option<String>,
}

/// `involved_companies.company` is an object when expanded and a bare id otherwise
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CompanyRef {
    Expanded(Named),
    Id(i64),
}

impl CompanyRef {
    fn name(&self) -> Option<&str> {
        match self {
            CompanyRef::Expanded(named) => named.name.as_deref(),
            CompanyRef::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawInvolvedCompany {
    #[serde(default)]
    pub company: Option<CompanyRef>,
    #[serde(default)]
    pub developer: bool,
    #[serde(default)]
    pub publisher: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCover {
    #[serde(default)]
    pub url: Option<String>,
}

/// One element of a `/games` response
#[derive(Debug, Clone, Deserialize)]
pub struct RawGame {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub genres: Vec<Named>,
    #[serde(default)]
    pub involved_companies: Vec<RawInvolvedCompany>,
    #[serde(default)]
    pub aggregated_rating: Option<f64>,
    #[serde(default)]
    pub first_release_date: Option<i64>,
    #[serde(default)]
    pub platforms: Vec<Named>,
    #[serde(default)]
    pub cover: Option<RawCover>,
}

/// One element of an `/external_games` response
#[derive(Debug, Clone, Deserialize)]
pub struct RawExternalGame {
    #[serde(default)]
    pub game: Option<i64>,
    #[serde(default)]
    pub category: Option<i32>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl RawGame {
    /// Map into the cache schema, attaching the game's external ids
    pub fn into_record(self, external_ids: Vec<ExternalId>) -> GameRecord {
        let mut developers = Vec::new();
        let mut publishers = Vec::new();

        for involved in &self.involved_companies {
            let Some(name) = involved.company.as_ref().and_then(CompanyRef::name) else {
                continue;
            };
            if involved.developer {
                developers.push(name.to_string());
            }
            if involved.publisher {
                publishers.push(name.to_string());
            }
        }

        GameRecord {
            igdb_id: self.id,
            name: self.name.unwrap_or_default(),
            summary: self.summary,
            genres: names(self.genres),
            developers,
            publishers,
            aggregated_rating: self.aggregated_rating,
            release_date: self.first_release_date,
            platforms: names(self.platforms),
            cover_url: self.cover.and_then(|c| c.url),
            external_ids,
        }
    }
}

fn names(refs: Vec<Named>) -> Vec<String> {
    refs.into_iter().filter_map(|r| r.name).collect()
}

/// Group external ids by game, preserving response order.
///
/// Rows without a game or category cannot be attributed and are dropped.
pub fn group_external_ids(rows: Vec<RawExternalGame>) -> HashMap<i64, Vec<ExternalId>> {
    let mut grouped: HashMap<i64, Vec<ExternalId>> = HashMap::new();

    for row in rows {
        let (Some(game), Some(category)) = (row.game, row.category) else {
            continue;
        };
        grouped
            .entry(game)
            .or_default()
            .push(ExternalId::new(category, row.uid, row.url));
    }

    grouped
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_game_maps_into_record() {
        let raw: RawGame = serde_json::from_value(json!({
            "id": 1942,
            "name": "The Witcher 3: Wild Hunt",
            "summary": "RPG",
            "genres": [{"id": 12, "name": "Role-playing (RPG)"}, {"id": 31}],
            "involved_companies": [
                {"id": 1, "company": {"id": 908, "name": "CD Projekt RED"}, "developer": true, "publisher": false},
                {"id": 2, "company": {"id": 1, "name": "Warner Bros."}, "developer": false, "publisher": true},
                {"id": 3, "company": 77, "developer": true, "publisher": true}
            ],
            "aggregated_rating": 92.5,
            "first_release_date": 1431993600,
            "platforms": [{"id": 6, "name": "PC (Microsoft Windows)"}],
            "cover": {"id": 89386, "url": "//images.igdb.com/igdb/image/upload/t_thumb/co1wyy.jpg"}
        }))
        .unwrap();

        let record = raw.into_record(vec![ExternalId::new(1, Some("292030".into()), None)]);

        assert_eq!(record.igdb_id, 1942);
        assert_eq!(record.name, "The Witcher 3: Wild Hunt");
        assert_eq!(record.genres, vec!["Role-playing (RPG)"]);
        assert_eq!(record.developers, vec!["CD Projekt RED"]);
        assert_eq!(record.publishers, vec!["Warner Bros."]);
        assert_eq!(record.aggregated_rating, Some(92.5));
        assert_eq!(record.release_date, Some(1431993600));
        assert_eq!(record.platforms, vec!["PC (Microsoft Windows)"]);
        assert_eq!(
            record.cover_url.as_deref(),
            Some("//images.igdb.com/igdb/image/upload/t_thumb/co1wyy.jpg")
        );
        assert_eq!(record.external_ids[0].store, "steam");
    }

    #[test]
    fn test_sparse_game_maps_with_defaults() {
        let raw: RawGame = serde_json::from_value(json!({"id": 5})).unwrap();
        let record = raw.into_record(Vec::new());

        assert_eq!(record, GameRecord::new(5, ""));
    }

    #[test]
    fn test_group_external_ids_skips_unattributable_rows() {
        let rows: Vec<RawExternalGame> = serde_json::from_value(json!([
            {"id": 1, "game": 10, "category": 1, "uid": "100"},
            {"id": 2, "game": 10, "category": 5, "uid": "abc", "url": "https://gog.com/x"},
            {"id": 3, "game": 11, "category": 99},
            {"id": 4, "category": 1, "uid": "orphan"},
            {"id": 5, "game": 12}
        ]))
        .unwrap();

        let grouped = group_external_ids(rows);

        assert_eq!(grouped.len(), 2);
        let stores: Vec<_> = grouped[&10].iter().map(|e| e.store.as_str()).collect();
        assert_eq!(stores, vec!["steam", "gog"]);
        assert_eq!(grouped[&11][0].store, "store_99");
    }
}
