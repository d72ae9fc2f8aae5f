//! Configuration for the fetch and partition stages
//!
//! Both configs start from defaults, are overridden by environment variables
//! (`from_env`), and can be assembled in code through their builders.

use igdb_cache_common::{PipelineError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Upstream Constants
// ============================================================================

/// IGDB v4 API root
pub const DEFAULT_API_BASE_URL: &str = "https://api.igdb.com/v4";

/// Twitch OAuth2 token endpoint used by IGDB
pub const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// IGDB rejects `limit` values above 500
pub const MAX_PAGE_SIZE: u32 = 500;

/// IGDB allows 4 requests per second per client
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 4;

/// IGDB allows at most 8 open requests per client
pub const MAX_CONCURRENCY: usize = 8;

/// A full catalog is well above this; anything smaller is treated as a broken download
pub const DEFAULT_MIN_GAMES: usize = 100_000;

/// Restrict to main games unless overridden
pub const DEFAULT_GAMES_FILTER: &str = "category = 0";

pub const DEFAULT_CACHE_PATH: &str = "all_games.json";

/// Client secret or bearer token. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Settings for `run-fetch`
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Twitch application client id (`IGDB_CLIENT_ID`)
    pub client_id: String,

    /// Twitch application secret (`IGDB_CLIENT_SECRET`)
    pub client_secret: Secret,

    pub token_url: String,

    pub api_base_url: String,

    /// Records requested per page
    pub page_size: u32,

    /// Pages in flight at once
    pub concurrency: usize,

    /// Shared request budget across all in-flight pages
    pub requests_per_second: u32,

    /// Total tries per request, including the first
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubles each retry
    pub backoff_base: Duration,

    pub backoff_max: Duration,

    pub timeout: Duration,

    /// Refuse to replace the cache with a smaller catalog than this
    pub min_games: usize,

    /// Stop scanning after this many offsets (None = until exhausted)
    pub max_records: Option<u64>,

    /// APIcalypse `where` clause for the games endpoint (None = no filter)
    pub games_filter: Option<String>,

    pub cache_path: PathBuf,

    /// Draw a spinner on stderr while fetching
    pub show_progress: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: Secret::new(""),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            concurrency: 4,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            max_attempts: 5,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
            timeout: Duration::from_secs(60),
            min_games: DEFAULT_MIN_GAMES,
            max_records: None,
            games_filter: Some(DEFAULT_GAMES_FILTER.to_string()),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            show_progress: true,
        }
    }
}

impl FetchConfig {
    /// Start a builder with the two required credentials
    pub fn builder(client_id: impl Into<String>, client_secret: impl Into<String>) -> FetchConfigBuilder {
        FetchConfigBuilder {
            config: FetchConfig {
                client_id: client_id.into(),
                client_secret: Secret::new(client_secret),
                ..FetchConfig::default()
            },
        }
    }

    /// Load configuration from environment variables
    ///
    /// Required:
    /// - `IGDB_CLIENT_ID`, `IGDB_CLIENT_SECRET` (absence is an `AuthError`)
    ///
    /// Optional:
    /// - `IGDB_API_URL`, `IGDB_TOKEN_URL`
    /// - `IGDB_PAGE_SIZE`, `IGDB_CONCURRENCY`, `IGDB_REQUESTS_PER_SECOND`
    /// - `IGDB_MAX_ATTEMPTS`, `IGDB_BACKOFF_BASE_MS`, `IGDB_BACKOFF_MAX_MS`
    /// - `IGDB_TIMEOUT_SECS`, `IGDB_MIN_GAMES`, `IGDB_MAX_RECORDS`
    /// - `IGDB_GAMES_FILTER` (empty string disables the filter)
    /// - `IGDB_CACHE_PATH`
    pub fn from_env() -> Result<Self> {
        let client_id = required_env("IGDB_CLIENT_ID")?;
        let client_secret = required_env("IGDB_CLIENT_SECRET")?;

        let mut config = FetchConfig {
            client_id,
            client_secret: Secret::new(client_secret),
            ..FetchConfig::default()
        };

        if let Ok(url) = std::env::var("IGDB_API_URL") {
            config.api_base_url = url;
        }

        if let Ok(url) = std::env::var("IGDB_TOKEN_URL") {
            config.token_url = url;
        }

        if let Some(size) = parse_env("IGDB_PAGE_SIZE").map_err(PipelineError::fetch)? {
            config.page_size = size;
        }

        if let Some(n) = parse_env("IGDB_CONCURRENCY").map_err(PipelineError::fetch)? {
            config.concurrency = n;
        }

        if let Some(n) = parse_env("IGDB_REQUESTS_PER_SECOND").map_err(PipelineError::fetch)? {
            config.requests_per_second = n;
        }

        if let Some(n) = parse_env("IGDB_MAX_ATTEMPTS").map_err(PipelineError::fetch)? {
            config.max_attempts = n;
        }

        if let Some(ms) = parse_env("IGDB_BACKOFF_BASE_MS").map_err(PipelineError::fetch)? {
            config.backoff_base = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_env("IGDB_BACKOFF_MAX_MS").map_err(PipelineError::fetch)? {
            config.backoff_max = Duration::from_millis(ms);
        }

        if let Some(secs) = parse_env("IGDB_TIMEOUT_SECS").map_err(PipelineError::fetch)? {
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(n) = parse_env("IGDB_MIN_GAMES").map_err(PipelineError::fetch)? {
            config.min_games = n;
        }

        if let Some(n) = parse_env("IGDB_MAX_RECORDS").map_err(PipelineError::fetch)? {
            config.max_records = Some(n);
        }

        if let Ok(filter) = std::env::var("IGDB_GAMES_FILTER") {
            let filter = filter.trim();
            config.games_filter = (!filter.is_empty()).then(|| filter.to_string());
        }

        if let Ok(path) = std::env::var("IGDB_CACHE_PATH") {
            config.cache_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(PipelineError::auth("IGDB client id is empty"));
        }

        if self.client_secret.is_empty() {
            return Err(PipelineError::auth("IGDB client secret is empty"));
        }

        let invalid = |msg: String| -> Result<()> {
            Err(PipelineError::fetch(format!("invalid configuration: {}", msg)))
        };

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return invalid(format!("page size must be between 1 and {}", MAX_PAGE_SIZE));
        }

        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return invalid(format!("concurrency must be between 1 and {}", MAX_CONCURRENCY));
        }

        if self.requests_per_second == 0 {
            return invalid("requests per second must be greater than 0".to_string());
        }

        if self.max_attempts == 0 {
            return invalid("max attempts must be at least 1".to_string());
        }

        if self.timeout.is_zero() {
            return invalid("timeout must be greater than 0".to_string());
        }

        if self.api_base_url.is_empty() || self.token_url.is_empty() {
            return invalid("API and token URLs cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Builder for FetchConfig
#[derive(Debug)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.config.token_url = url.into();
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn requests_per_second(mut self, n: u32) -> Self {
        self.config.requests_per_second = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.config.backoff_base = base;
        self.config.backoff_max = max;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn min_games(mut self, n: usize) -> Self {
        self.config.min_games = n;
        self
    }

    pub fn max_records(mut self, n: u64) -> Self {
        self.config.max_records = Some(n);
        self
    }

    pub fn games_filter(mut self, filter: Option<String>) -> Self {
        self.config.games_filter = filter;
        self
    }

    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_path = path.into();
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    pub fn build(self) -> FetchConfig {
        self.config
    }
}

/// Settings for `run-partition`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionConfig {
    /// Cache artifact written by `run-fetch`
    pub cache_path: PathBuf,

    /// Directory receiving `games/` and `index.json`
    pub output_dir: PathBuf,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            output_dir: PathBuf::from("."),
        }
    }
}

impl PartitionConfig {
    pub fn new(cache_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Load configuration from `IGDB_CACHE_PATH` and `IGDB_OUTPUT_DIR`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("IGDB_CACHE_PATH") {
            config.cache_path = PathBuf::from(path);
        }

        if let Ok(dir) = std::env::var("IGDB_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        config
    }
}

fn required_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PipelineError::auth(format!(
            "{} is not set; export IGDB_CLIENT_ID and IGDB_CLIENT_SECRET",
            key
        ))),
    }
}

fn parse_env<T: FromStr>(key: &str) -> std::result::Result<Option<T>, String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("invalid value for {}: '{}'", key, raw)),
        Err(_) => Ok(None),
    }
}
