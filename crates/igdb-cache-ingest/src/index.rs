//! `index.json` model
//!
//! The index lists every bucket with its relative path, record count, byte
//! size and SHA-256, so a consumer can fetch only the buckets it needs and
//! verify them.

use chrono::{DateTime, SecondsFormat, Utc};
use igdb_cache_common::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Index format version
pub const INDEX_VERSION: &str = "1.0.0";

/// Layout of bucket files below the output directory
pub const STRUCTURE: &str = "games/{first_char}/{bucket}.json";

/// One bucket file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketEntry {
    pub key: String,
    /// Path relative to the output directory
    pub file: String,
    pub count: usize,
    /// Size in bytes
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIndex {
    pub version: String,
    /// RFC 3339, UTC, second precision
    pub generated_at: String,
    pub total_games: usize,
    pub bucket_count: usize,
    /// Number of distinct `games/<first_char>` directories
    pub subdir_count: usize,
    pub structure: String,
    pub buckets: Vec<BucketEntry>,
}

impl CatalogIndex {
    /// Build the index; buckets are sorted by key and totals derived from them
    pub fn new(generated_at: DateTime<Utc>, mut buckets: Vec<BucketEntry>) -> Self {
        buckets.sort_by(|a, b| a.key.cmp(&b.key));

        let subdirs: BTreeSet<&str> = buckets
            .iter()
            .filter_map(|b| b.file.split('/').nth(1))
            .collect();
        let subdir_count = subdirs.len();

        Self {
            version: INDEX_VERSION.to_string(),
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            total_games: buckets.iter().map(|b| b.count).sum(),
            bucket_count: buckets.len(),
            subdir_count,
            structure: STRUCTURE.to_string(),
            buckets,
        }
    }

    /// Pretty-printed JSON with a trailing newline
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| PipelineError::partition(format!("cannot serialize index: {}", e)))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
