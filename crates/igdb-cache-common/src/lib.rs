//! IGDB Cache Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the IGDB cache pipeline.
//!
//! # Overview
//!
//! This crate holds everything both pipeline stages agree on:
//!
//! - **Types**: The cache artifact schema ([`GameRecord`], [`ExternalId`])
//! - **Error Handling**: The pipeline error taxonomy ([`PipelineError`])
//! - **Checksums**: Content hashes recorded in the bucket index
//! - **Logging**: Centralized `tracing` setup for the binaries
//!
//! # Example
//!
//! ```no_run
//! use igdb_cache_common::{GameRecord, PipelineError, Result};
//!
//! fn load(path: &str) -> Result<Vec<GameRecord>> {
//!     let bytes = std::fs::read(path).map_err(|e| PipelineError::input(e.to_string()))?;
//!     serde_json::from_slice(&bytes).map_err(|e| PipelineError::input(e.to_string()))
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{PipelineError, Result};
pub use types::{ExternalId, GameRecord};
