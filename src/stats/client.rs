use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::types::{Artist, AudioFeatures, Paging, TimeRange, Track};

const API_BASE: &str = "https://api.spotify.com/v1";

/// Failures surfaced by the statistics API, mapped from upstream status
/// codes. None of these are retried automatically; each requires a new
/// user-triggered attempt.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("No Spotify access token found")]
    MissingCredential,

    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    RateLimited,

    #[error("Access token expired. Please log in again.")]
    CredentialExpired,

    #[error("Insufficient permissions. Check that the app scopes include \"user-top-read\".")]
    InsufficientScope,

    #[error("Statistics API error: {0}")]
    Upstream(u16),

    #[error("Network error: {0}")]
    Network(String),
}

/// Map a non-2xx upstream status to the error taxonomy.
pub fn map_status(status: u16) -> StatsError {
    match status {
        429 => StatsError::RateLimited,
        401 => StatsError::CredentialExpired,
        403 => StatsError::InsufficientScope,
        other => StatsError::Upstream(other),
    }
}

#[derive(Debug, Deserialize)]
struct AudioFeaturesResponse {
    #[serde(default)]
    audio_features: Vec<Option<AudioFeatures>>,
}

pub struct StatsClient {
    http: reqwest::Client,
    base: String,
}

impl Default for StatsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsClient {
    pub fn new() -> Self {
        Self::with_base(API_BASE)
    }

    /// Point the client at a different base URL. Exists for test doubles.
    pub fn with_base(base: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build reqwest client");
        Self {
            http,
            base: base.into(),
        }
    }

    /// Fetch the user's top artists, preserving upstream rank order.
    pub async fn top_artists(
        &self,
        token: &str,
        range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Artist>, StatsError> {
        self.top_items("artists", token, range, limit).await
    }

    /// Fetch the user's top tracks, preserving upstream rank order.
    pub async fn top_tracks(
        &self,
        token: &str,
        range: TimeRange,
        limit: u32,
    ) -> Result<Vec<Track>, StatsError> {
        self.top_items("tracks", token, range, limit).await
    }

    async fn top_items<T: serde::de::DeserializeOwned>(
        &self,
        kind: &str,
        token: &str,
        range: TimeRange,
        limit: u32,
    ) -> Result<Vec<T>, StatsError> {
        if token.is_empty() {
            return Err(StatsError::MissingCredential);
        }

        info!("Fetching top {} ({}, limit {})", kind, range.label(), limit);
        let url = format!("{}/me/top/{}", self.base, kind);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("limit", limit.to_string()),
                ("time_range", range.as_param().to_string()),
            ])
            .send()
            .await
            .map_err(|e| StatsError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Top {} request failed: {} {}", kind, status, body);
            return Err(map_status(status.as_u16()));
        }

        let page: Paging<T> = response
            .json()
            .await
            .map_err(|e| StatsError::Network(e.to_string()))?;
        Ok(page.items)
    }

    /// Fetch audio features for the given track ids, keyed by id.
    ///
    /// Best effort by contract: callers treat a failure here as an empty map
    /// and carry on. Upstream returns null entries for unknown ids; those
    /// are skipped.
    pub async fn audio_features(
        &self,
        token: &str,
        ids: &[String],
    ) -> Result<HashMap<String, AudioFeatures>, StatsError> {
        if token.is_empty() {
            return Err(StatsError::MissingCredential);
        }
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        info!("Fetching audio features for {} tracks", ids.len());
        let url = format!("{}/audio-features", self.base);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("ids", ids.join(","))])
            .send()
            .await
            .map_err(|e| StatsError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Audio features request failed: {} {}", status, body);
            return Err(map_status(status.as_u16()));
        }

        let parsed: AudioFeaturesResponse = response
            .json()
            .await
            .map_err(|e| StatsError::Network(e.to_string()))?;

        Ok(parsed
            .audio_features
            .into_iter()
            .flatten()
            .map(|f| (f.id.clone(), f))
            .collect())
    }
}
