// IGDB API client
//
// Every request goes through the shared RequestLimiter and the retry
// combinator. A catalog page is one `/games` request plus as many
// `/external_games` requests as it takes to exhaust that page's ids.

use crate::config::FetchConfig;
use crate::igdb::auth::{request_token, AccessToken};
use crate::igdb::models::{group_external_ids, RawExternalGame, RawGame};
use crate::igdb::{query, ApiError};
use crate::rate_limit::RequestLimiter;
use crate::retry::{retry_with_backoff, RetryPolicy};
use igdb_cache_common::{GameRecord, PipelineError, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// One page of the catalog, already mapped into cache records
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub offset: u64,
    /// Number of `/games` rows returned, before mapping
    pub raw_len: usize,
    pub games: Vec<GameRecord>,
}

/// Authenticated, rate-limited IGDB client
pub struct IgdbClient {
    http: Client,
    api_base_url: String,
    client_id: String,
    token: AccessToken,
    limiter: Arc<RequestLimiter>,
    retry: RetryPolicy,
    page_size: u32,
    games_filter: Option<String>,
}

impl IgdbClient {
    /// Build the HTTP client and authenticate
    pub async fn connect(config: &FetchConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("igdb-cache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::fetch(format!("cannot build HTTP client: {}", e)))?;

        let retry = RetryPolicy::new(config.max_attempts, config.backoff_base, config.backoff_max);
        let token = request_token(
            &http,
            &config.token_url,
            &config.client_id,
            &config.client_secret,
            &retry,
        )
        .await?;

        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            token,
            limiter: Arc::new(RequestLimiter::per_second(config.requests_per_second)),
            retry,
            page_size: config.page_size,
            games_filter: config.games_filter.clone(),
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetch the games at `offset` together with their external ids
    #[instrument(skip(self))]
    pub async fn fetch_page(&self, offset: u64) -> Result<CatalogPage> {
        let raw = self.games_page(offset).await?;
        let raw_len = raw.len();

        let ids: Vec<i64> = raw.iter().map(|g| g.id).collect();
        let mut external = if ids.is_empty() {
            Default::default()
        } else {
            group_external_ids(self.external_games(&ids).await?)
        };

        let games = raw
            .into_iter()
            .map(|game| {
                let ext = external.remove(&game.id).unwrap_or_default();
                game.into_record(ext)
            })
            .collect();

        debug!(offset, games = raw_len, "Fetched catalog page");

        Ok(CatalogPage {
            offset,
            raw_len,
            games,
        })
    }

    /// One `/games` page
    pub async fn games_page(&self, offset: u64) -> Result<Vec<RawGame>> {
        let body = query::games_query(self.games_filter.as_deref(), offset, self.page_size);

        retry_with_backoff(&self.retry, "games", |_| self.post_query("games", body.clone()))
            .await
            .map_err(|e| {
                PipelineError::fetch_exhausted(
                    format!("games page at offset {} failed: {}", offset, e),
                    e.attempts,
                )
            })
    }

    /// All `/external_games` rows for `game_ids`, paging until a short page
    pub async fn external_games(&self, game_ids: &[i64]) -> Result<Vec<RawExternalGame>> {
        let mut rows = Vec::new();
        let mut offset = 0u64;

        loop {
            let body = query::external_games_query(game_ids, offset, self.page_size);
            let page: Vec<RawExternalGame> = retry_with_backoff(&self.retry, "external_games", |_| {
                self.post_query("external_games", body.clone())
            })
            .await
            .map_err(|e| {
                PipelineError::fetch_exhausted(
                    format!(
                        "external ids for games {}..={} failed: {}",
                        game_ids.first().copied().unwrap_or_default(),
                        game_ids.last().copied().unwrap_or_default(),
                        e
                    ),
                    e.attempts,
                )
            })?;

            let len = page.len();
            rows.extend(page);

            if len < self.page_size as usize {
                break;
            }
            offset += u64::from(self.page_size);
        }

        Ok(rows)
    }

    /// POST an APIcalypse body to `endpoint` and decode a JSON array
    async fn post_query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: String,
    ) -> std::result::Result<Vec<T>, ApiError> {
        self.limiter.acquire().await;

        let url = format!("{}/{}", self.api_base_url, endpoint);
        let response = self
            .http
            .post(&url)
            .header("Client-ID", &self.client_id)
            .header("Authorization", self.token.bearer())
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::status(status, &text, retry_after));
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(format!("{}: {}", endpoint, e)))
    }
}
