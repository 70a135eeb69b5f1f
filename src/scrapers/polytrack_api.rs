//! PolyTrack Leaderboard API Client
//!
//! Paginated reads of one track's ranked list. Pacing between calls is the
//! caller's job (see `scrapers::pacing`); this client issues exactly one
//! request per `fetch_page`.

use crate::models::LeaderboardPage;
use anyhow::{Context, Result};
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://vps.kodub.com";
pub const DEFAULT_API_VERSION: &str = "0.5.1";
/// Largest `amount` the service accepts per page.
pub const MAX_PAGE_AMOUNT: u32 = 500;

/// Why a page could not be obtained.
#[derive(Debug)]
pub enum FetchCause {
    Transport(String),
    Status { code: u16, body: String },
    Decode(String),
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Status { code, body } => write!(f, "HTTP {}: {}", code, body),
            Self::Decode(e) => write!(f, "malformed body: {}", e),
        }
    }
}

/// A single page fetch failed. Carries the track so callers can log it.
#[derive(Debug)]
pub struct FetchFailure {
    pub track_id: String,
    pub cause: FetchCause,
}

impl FetchFailure {
    pub fn new(track_id: &str, cause: FetchCause) -> Self {
        Self {
            track_id: track_id.to_string(),
            cause,
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch failed for track {}: {}", self.track_id, self.cause)
    }
}

impl std::error::Error for FetchFailure {}

/// Source of ranked leaderboard pages.
#[async_trait::async_trait]
pub trait LeaderboardSource: Send + Sync {
    /// Returns at most `amount` entries starting at `skip`, plus the service's
    /// current total for the track.
    async fn fetch_page(
        &self,
        track_id: &str,
        skip: u32,
        amount: u32,
    ) -> Result<LeaderboardPage, FetchFailure>;
}

#[derive(Debug, Clone)]
pub struct PolytrackClientConfig {
    pub base_url: String,
    pub version: String,
    pub only_verified: bool,
    pub timeout: Duration,
}

impl Default for PolytrackClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            version: DEFAULT_API_VERSION.to_string(),
            only_verified: false,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct PolytrackClient {
    client: Client,
    config: PolytrackClientConfig,
}

impl PolytrackClient {
    pub fn new(config: PolytrackClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(2)
            .build()
            .context("Failed to build leaderboard HTTP client")?;

        Ok(Self { client, config })
    }

    #[inline]
    fn url(&self) -> String {
        format!("{}/leaderboard", self.config.base_url.trim_end_matches('/'))
    }

    fn query(&self, track_id: &str, skip: u32, amount: u32) -> Vec<(&'static str, String)> {
        vec![
            ("version", self.config.version.clone()),
            ("trackId", track_id.to_string()),
            ("skip", skip.to_string()),
            ("amount", amount.min(MAX_PAGE_AMOUNT).to_string()),
            ("onlyVerified", self.config.only_verified.to_string()),
        ]
    }
}

#[async_trait::async_trait]
impl LeaderboardSource for PolytrackClient {
    async fn fetch_page(
        &self,
        track_id: &str,
        skip: u32,
        amount: u32,
    ) -> Result<LeaderboardPage, FetchFailure> {
        let qp = self.query(track_id, skip, amount);
        debug!(track = track_id, skip, amount, "GET /leaderboard");

        let resp = self
            .client
            .get(self.url())
            .query(&qp)
            .send()
            .await
            .map_err(|e| FetchFailure::new(track_id, FetchCause::Transport(e.to_string())))?;

        if !resp.status().is_success() {
            let code = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchFailure::new(track_id, FetchCause::Status { code, body }));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchFailure::new(track_id, FetchCause::Transport(e.to_string())))?;

        parse_page(track_id, &body)
    }
}

/// Shape-checks a response body.
pub fn parse_page(track_id: &str, body: &str) -> Result<LeaderboardPage, FetchFailure> {
    serde_json::from_str::<LeaderboardPage>(body)
        .map_err(|e| FetchFailure::new(track_id, FetchCause::Decode(e.to_string())))
}
