//! HTTP client for the public FPL API.

use crate::error::{Error, Result};
use crate::models::{
    Bootstrap, ElementSummary, Entry, Fixture, History, LiveGameweek, Picks, Transfer,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const FPL_API_URL: &str = "https://fantasy.premierleague.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BOOTSTRAP_TTL: Duration = Duration::from_secs(300);

/// Builder for creating an FPL client.
#[derive(Debug, Clone)]
pub struct FplClientBuilder {
    base_url: String,
    bootstrap_ttl: Duration,
}

impl Default for FplClientBuilder {
    fn default() -> Self {
        Self {
            base_url: FPL_API_URL.to_string(),
            bootstrap_ttl: BOOTSTRAP_TTL,
        }
    }
}

impl FplClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// How long a fetched `/bootstrap-static/` payload is reused.
    pub fn bootstrap_ttl(mut self, ttl: Duration) -> Self {
        self.bootstrap_ttl = ttl;
        self
    }

    pub fn build(self) -> Result<FplClient> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("touchline/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(FplClient {
            http,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            bootstrap_ttl: self.bootstrap_ttl,
            bootstrap: Mutex::new(None),
        })
    }
}

/// Read-only FPL API client.
///
/// The bootstrap payload (every player, team and gameweek) is large, so it
/// is cached for a few minutes and shared between concurrent tool calls.
/// No authentication is used; manager endpoints are public by team id.
pub struct FplClient {
    http: reqwest::Client,
    base_url: String,
    bootstrap_ttl: Duration,
    bootstrap: Mutex<Option<(Instant, Arc<Bootstrap>)>>,
}

impl FplClient {
    pub fn builder() -> FplClientBuilder {
        FplClientBuilder::default()
    }

    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Players, teams and gameweeks, served from cache while fresh.
    pub async fn bootstrap(&self) -> Result<Arc<Bootstrap>> {
        // Held across the fetch so concurrent callers wait for one refresh.
        let mut cached = self.bootstrap.lock().await;
        if let Some((fetched_at, bootstrap)) = cached.as_ref()
            && fetched_at.elapsed() < self.bootstrap_ttl
        {
            return Ok(Arc::clone(bootstrap));
        }

        let bootstrap: Arc<Bootstrap> = Arc::new(self.get("/bootstrap-static/").await?);
        debug!(
            players = bootstrap.elements.len(),
            gameweeks = bootstrap.events.len(),
            "bootstrap cache refreshed"
        );
        *cached = Some((Instant::now(), Arc::clone(&bootstrap)));
        Ok(bootstrap)
    }

    pub async fn player_summary(&self, player_id: u32) -> Result<ElementSummary> {
        self.get(&format!("/element-summary/{player_id}/")).await
    }

    pub async fn fixtures(&self, gameweek: u32) -> Result<Vec<Fixture>> {
        self.get(&format!("/fixtures/?event={gameweek}")).await
    }

    /// Every fixture of the season.
    pub async fn all_fixtures(&self) -> Result<Vec<Fixture>> {
        self.get("/fixtures/").await
    }

    /// Per-player points for a gameweek.
    pub async fn live_gameweek(&self, gameweek: u32) -> Result<LiveGameweek> {
        self.get(&format!("/event/{gameweek}/live/")).await
    }

    pub async fn entry(&self, team_id: u64) -> Result<Entry> {
        self.get(&format!("/entry/{team_id}/")).await
    }

    pub async fn entry_history(&self, team_id: u64) -> Result<History> {
        self.get(&format!("/entry/{team_id}/history/")).await
    }

    pub async fn picks(&self, team_id: u64, gameweek: u32) -> Result<Picks> {
        self.get(&format!("/entry/{team_id}/event/{gameweek}/picks/"))
            .await
    }

    pub async fn transfers(&self, team_id: u64) -> Result<Vec<Transfer>> {
        self.get(&format!("/entry/{team_id}/transfers/")).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "GET");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("FPL API has nothing at {path}")));
        }
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| Error::Decode {
            path: path.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for FplClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FplClient")
            .field("base_url", &self.base_url)
            .field("bootstrap_ttl", &self.bootstrap_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_normalizes_base_url() {
        let client = FplClient::builder()
            .base_url("http://localhost:9000/api/")
            .bootstrap_ttl(Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(client.base_url, "http://localhost:9000/api");
        assert_eq!(client.bootstrap_ttl, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn fresh_cache_is_served_without_a_request() {
        // Unroutable base URL: any request would fail.
        let client = FplClient::builder()
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let seeded = Arc::new(Bootstrap::default());
        *client.bootstrap.lock().await = Some((Instant::now(), Arc::clone(&seeded)));

        let served = client.bootstrap().await.unwrap();
        assert!(Arc::ptr_eq(&served, &seeded));
    }

    #[tokio::test]
    async fn stale_cache_is_refetched() {
        let client = FplClient::builder()
            .base_url("http://127.0.0.1:9")
            .bootstrap_ttl(Duration::ZERO)
            .build()
            .unwrap();
        *client.bootstrap.lock().await = Some((Instant::now(), Arc::new(Bootstrap::default())));

        assert!(client.bootstrap().await.is_err());
    }
}
