// IGDB API Module
//
// Talks to the IGDB v4 API on behalf of the fetch stage:
// - Auth: Twitch OAuth2 client-credentials exchange
// - Query: APIcalypse request bodies for games and external ids
// - Models: raw response schemas and their mapping into GameRecord
// - Client: rate-limited, retried POSTs assembling one catalog page at a time
//
// Endpoints:
// - Token: https://id.twitch.tv/oauth2/token
// - Games: https://api.igdb.com/v4/games
// - External ids: https://api.igdb.com/v4/external_games

pub mod auth;
pub mod client;
pub mod models;
pub mod query;

// Re-export main types
pub use auth::AccessToken;
pub use client::{CatalogPage, IgdbClient};
pub use models::{RawExternalGame, RawGame};

use crate::retry::Retryable;
use reqwest::StatusCode;
use std::time::Duration;

/// Longest response body excerpt kept in an error message
const BODY_EXCERPT_LEN: usize = 200;

/// Failure of a single HTTP exchange with IGDB or Twitch
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {body}")]
    Status {
        status: StatusCode,
        body: String,
        retry_after: Option<Duration>,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Build a status error, flattening the body to one short line
    pub fn status(status: StatusCode, body: &str, retry_after: Option<Duration>) -> Self {
        let mut excerpt: String = body
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(BODY_EXCERPT_LEN)
            .collect();
        if excerpt.is_empty() {
            excerpt.push_str("<empty body>");
        }

        ApiError::Status {
            status,
            body: excerpt,
            retry_after,
        }
    }
}

impl Retryable for ApiError {
    fn is_transient(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            },
            ApiError::Transport(err) => {
                err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
            },
            ApiError::Decode(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
