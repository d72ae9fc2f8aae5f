//! Fetch stage: download the whole IGDB catalog into the cache artifact
//!
//! Pages are requested in waves of `concurrency` offsets. All requests share
//! one rate limiter, every request is retried on transient failures, and the
//! scan ends after the first wave that contains a short page. The cache is
//! only replaced once the complete catalog is in memory and has passed the
//! minimum-size check.

use crate::cache;
use crate::config::FetchConfig;
use crate::igdb::{CatalogPage, IgdbClient};
use crate::progress::{create_spinner, format_bytes};
use futures::stream::{self, StreamExt, TryStreamExt};
use igdb_cache_common::{GameRecord, PipelineError, Result};
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// De-duplicated catalog, keyed and ordered by `igdb_id`
#[derive(Debug, Default)]
pub struct Catalog {
    games: BTreeMap<i64, GameRecord>,
    duplicates: usize,
    pages: usize,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one page. A record whose id is already present is counted and dropped.
    pub fn add_page(&mut self, games: Vec<GameRecord>) {
        self.pages += 1;
        for game in games {
            if self.games.contains_key(&game.igdb_id) {
                debug!(igdb_id = game.igdb_id, "Dropping duplicate game");
                self.duplicates += 1;
            } else {
                self.games.insert(game.igdb_id, game);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Records in ascending `igdb_id` order
    pub fn into_games(self) -> Vec<GameRecord> {
        self.games.into_values().collect()
    }
}

/// Outcome of a successful fetch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub games: usize,
    pub duplicates: usize,
    pub pages: usize,
    pub bytes: u64,
    pub cache_path: PathBuf,
}

/// Offsets of the wave starting at `start`, bounded by `max_records`
fn wave_offsets(start: u64, page_size: u64, concurrency: usize, max_records: Option<u64>) -> Vec<u64> {
    (0..concurrency as u64)
        .map(|i| start + i * page_size)
        .take_while(|offset| max_records.map_or(true, |max| *offset < max))
        .collect()
}

/// Scan the catalog until a short page or `max_records`
pub async fn fetch_catalog(
    client: &IgdbClient,
    concurrency: usize,
    max_records: Option<u64>,
    progress: &ProgressBar,
) -> Result<Catalog> {
    let page_size = u64::from(client.page_size());
    let concurrency = concurrency.max(1);
    let mut catalog = Catalog::new();
    let mut next_offset = 0u64;

    loop {
        let offsets = wave_offsets(next_offset, page_size, concurrency, max_records);
        let Some(&last) = offsets.last() else {
            debug!(next_offset, "Reached max_records");
            break;
        };
        next_offset = last + page_size;

        let mut pages: Vec<CatalogPage> = stream::iter(offsets)
            .map(|offset| client.fetch_page(offset))
            .buffer_unordered(concurrency)
            .try_collect()
            .await?;

        // Completion order is arbitrary; merge in offset order
        pages.sort_by_key(|page| page.offset);
        let exhausted = pages.iter().any(|page| (page.raw_len as u64) < page_size);

        for page in pages {
            catalog.add_page(page.games);
        }

        progress.set_message(format!("Fetched {} games", catalog.len()));

        if exhausted {
            break;
        }
    }

    Ok(catalog)
}

/// Run the fetch stage end to end
pub async fn run(config: &FetchConfig) -> Result<FetchSummary> {
    let started = Instant::now();
    let client = IgdbClient::connect(config).await?;

    info!(
        page_size = config.page_size,
        concurrency = config.concurrency,
        requests_per_second = config.requests_per_second,
        filter = config.games_filter.as_deref().unwrap_or("<none>"),
        "Fetching IGDB catalog"
    );

    let progress = create_spinner("Fetching games", config.show_progress);
    let fetched = fetch_catalog(&client, config.concurrency, config.max_records, &progress).await;
    progress.finish_and_clear();
    let catalog = fetched?;

    if catalog.duplicates() > 0 {
        warn!(duplicates = catalog.duplicates(), "Dropped duplicate games");
    }

    if catalog.len() < config.min_games {
        return Err(PipelineError::fetch(format!(
            "fetched only {} games, expected at least {}; keeping previous cache",
            catalog.len(),
            config.min_games
        )));
    }

    let summary_pages = catalog.pages();
    let duplicates = catalog.duplicates();
    let games = catalog.into_games();
    let bytes = cache::write_cache(&config.cache_path, &games)?;

    info!(
        games = games.len(),
        duplicates,
        pages = summary_pages,
        size = %format_bytes(bytes),
        elapsed_secs = started.elapsed().as_secs(),
        "Fetch complete"
    );

    Ok(FetchSummary {
        games: games.len(),
        duplicates,
        pages: summary_pages,
        bytes,
        cache_path: config.cache_path.clone(),
    })
}
