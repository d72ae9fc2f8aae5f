//! APIcalypse request bodies
//!
//! IGDB takes its query language as the raw POST body, one clause per
//! statement, each terminated by `;`.

/// Fields selected from `/games`, expanded one level where a name is needed
pub const GAME_FIELDS: &[&str] = &[
    "id",
    "name",
    "summary",
    "genres.name",
    "involved_companies.company.name",
    "involved_companies.developer",
    "involved_companies.publisher",
    "aggregated_rating",
    "first_release_date",
    "platforms.name",
    "cover.url",
];

/// Fields selected from `/external_games`
pub const EXTERNAL_GAME_FIELDS: &[&str] = &["game", "category", "uid", "url"];

/// Query for one page of games, ordered by id so offsets are stable
pub fn games_query(filter: Option<&str>, offset: u64, limit: u32) -> String {
    let mut query = format!("fields {};\n", GAME_FIELDS.join(","));
    if let Some(filter) = filter {
        query.push_str(&format!("where {};\n", filter));
    }
    query.push_str(&format!("sort id asc;\noffset {};\nlimit {};\n", offset, limit));
    query
}

/// Query for one page of external ids belonging to `game_ids`
pub fn external_games_query(game_ids: &[i64], offset: u64, limit: u32) -> String {
    let ids = game_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "fields {};\nwhere game = ({});\nsort id asc;\noffset {};\nlimit {};\n",
        EXTERNAL_GAME_FIELDS.join(","),
        ids,
        offset,
        limit
    )
}
