//! IGDB Cache Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! The two batch stages of the pipeline:
//!
//! - **Fetch** ([`fetcher`]): authenticate against Twitch, page through the
//!   IGDB `/games` endpoint with bounded parallelism, de-duplicate, and
//!   atomically replace the cache artifact
//! - **Partition** ([`partition`]): split the cache into
//!   `games/<first-char>/<key>.json` bucket files plus `index.json`, swapped
//!   into place as a whole
//!
//! # Example
//!
//! ```no_run
//! use igdb_cache_ingest::config::{FetchConfig, PartitionConfig};
//! use igdb_cache_ingest::{fetcher, partition};
//!
//! #[tokio::main]
//! async fn main() -> igdb_cache_common::Result<()> {
//!     let fetch = FetchConfig::from_env()?;
//!     fetcher::run(&fetch).await?;
//!
//!     partition::run(&PartitionConfig::from_env())?;
//!     Ok(())
//! }
//! ```

pub mod bucket;
pub mod cache;
pub mod cli;
pub mod config;
pub mod fetcher;
pub mod igdb;
pub mod index;
pub mod partition;
pub mod progress;
pub mod rate_limit;
pub mod retry;
