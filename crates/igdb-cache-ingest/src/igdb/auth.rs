// Twitch OAuth2 client-credentials exchange

use crate::config::Secret;
use crate::igdb::ApiError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use igdb_cache_common::{PipelineError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Bearer token for the IGDB API
#[derive(Debug, Clone)]
pub struct AccessToken {
    token: Secret,
    expires_in: Option<Duration>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_in: Option<Duration>) -> Self {
        Self {
            token: Secret::new(token),
            expires_in,
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose())
    }

    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_in
    }
}

/// Exchange client credentials for an access token.
///
/// Transient failures (429, 5xx, network) are retried under `policy`;
/// rejected credentials fail at once. Every failure is an `AuthError`.
pub async fn request_token(
    http: &Client,
    token_url: &str,
    client_id: &str,
    client_secret: &Secret,
    policy: &RetryPolicy,
) -> Result<AccessToken> {
    info!("Authenticating with Twitch");

    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret.expose()),
        ("grant_type", "client_credentials"),
    ];

    let response: TokenResponse = retry_with_backoff(policy, "token", |_| async {
        let response = http.post(token_url).form(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::status(status, &body, None));
        }

        serde_json::from_str::<TokenResponse>(&body).map_err(|e| ApiError::Decode(e.to_string()))
    })
    .await
    .map_err(|e| PipelineError::auth(format!("token request to {} failed: {}", token_url, e)))?;

    if response.access_token.is_empty() {
        return Err(PipelineError::auth("token endpoint returned an empty access token"));
    }

    let token = AccessToken::new(
        response.access_token,
        response.expires_in.map(Duration::from_secs),
    );

    match token.expires_in() {
        Some(ttl) => info!(expires_in_hours = ttl.as_secs() / 3600, "Authenticated"),
        None => info!("Authenticated"),
    }

    Ok(token)
}
