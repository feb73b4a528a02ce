//! `SoundtrackClient` - Spotify soundtrack client implementation.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use tokio::time::Instant;
use tracing::instrument;
use url::Url;

use super::api::LocalSoundtrackApi;
use super::types::{
    Album, Paging, PlaylistEntry, SearchResponse, Soundtrack, SpotifyErrorResponse,
    TokenErrorResponse, TokenResponse, Track,
};

/// Default base URL for the Spotify Web API.
const DEFAULT_BASE_URL: &str = "https://api.spotify.com/v1/";

/// Default client-credentials token endpoint.
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Maximum number of retries for HTTP 429 responses.
const MAX_RETRIES: u32 = 3;

/// Backoff between retries when no `Retry-After` is sent.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Longest `Retry-After` honored.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default lifetime of cached soundtrack results.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Tokens are renewed this long before they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Tracks requested per soundtrack search.
const SEARCH_LIMIT: u32 = 10;

/// Largest page size the Web API accepts.
const MAX_LIMIT: u32 = 50;

/// Last-resort query when nothing matches the title.
const FALLBACK_QUERY: &str = "Popular Tamil songs";

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() < at)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    expires_at: Option<Instant>,
    soundtrack: Soundtrack,
}

/// Spotify soundtrack client.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct SoundtrackClient {
    /// HTTP client.
    http_client: Client,
    /// Base URL for Web API requests.
    base_url: Url,
    /// Client-credentials token endpoint.
    token_url: Url,
    /// Application client ID.
    client_id: String,
    /// Application client secret.
    client_secret: String,
    /// Current access token; the lock is held while a new one is requested.
    token: tokio::sync::Mutex<Option<AccessToken>>,
    /// Soundtracks by normalized lowercase title.
    cache: Mutex<HashMap<String, CacheEntry>>,
    /// Lifetime of cache entries.
    cache_ttl: Duration,
}

/// Builder for `SoundtrackClient`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct SoundtrackClientBuilder {
    base_url: Option<Url>,
    token_url: Option<Url>,
    client_id: Option<String>,
    client_secret: Option<String>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    cache_ttl: Option<Duration>,
}

impl SoundtrackClientBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            base_url: None,
            token_url: None,
            client_id: None,
            client_secret: None,
            user_agent: None,
            timeout: None,
            cache_ttl: None,
        }
    }

    /// Overrides the Web API base URL (for wiremock in tests).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Overrides the token endpoint (for wiremock in tests).
    #[must_use]
    pub fn token_url(mut self, url: Url) -> Self {
        self.token_url = Some(url);
        self
    }

    /// Sets the application client ID (required).
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets the application client secret (required).
    #[must_use]
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the User-Agent (required).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the per-request timeout (default: 10s).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets how long soundtrack results are reused (default: 30min).
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - `client_id` or `client_secret` is not set or blank.
    /// - `user_agent` is not set.
    /// - `reqwest::Client` build fails.
    pub fn build(self) -> Result<SoundtrackClient> {
        let client_id = self
            .client_id
            .filter(|v| !v.trim().is_empty())
            .context("client_id is required")?;
        let client_secret = self
            .client_secret
            .filter(|v| !v.trim().is_empty())
            .context("client_secret is required")?;
        let user_agent = self.user_agent.context("user_agent is required")?;

        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL).context("invalid default base URL")?,
        };
        let token_url = match self.token_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_TOKEN_URL).context("invalid default token URL")?,
        };

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .gzip(true)
            .build()
            .context("failed to build HTTP client")?;

        Ok(SoundtrackClient {
            http_client,
            base_url,
            token_url,
            client_id,
            client_secret,
            token: tokio::sync::Mutex::new(None),
            cache: Mutex::new(HashMap::new()),
            cache_ttl: self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL),
        })
    }
}

impl SoundtrackClient {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> SoundtrackClientBuilder {
        SoundtrackClientBuilder::new()
    }

    /// Returns a valid access token, requesting a new one when needed.
    async fn access_token(&self) -> Result<String> {
        let mut slot = self.token.lock().await;
        if let Some(ref token) = *slot
            && token.is_fresh()
        {
            return Ok(token.value.clone());
        }
        let token = self.request_token().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }

    /// Runs the client-credentials grant.
    #[instrument(skip_all)]
    async fn request_token(&self) -> Result<AccessToken> {
        tracing::debug!("requesting Spotify access token");
        let response = self
            .http_client
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Spotify token request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read token response body")?;

        if !status.is_success() {
            if let Ok(error_response) = serde_json::from_str::<TokenErrorResponse>(&body) {
                bail!(
                    "Spotify token request rejected (HTTP {status}): {}",
                    error_response
                        .error_description
                        .unwrap_or(error_response.error)
                );
            }
            bail!("Spotify token request rejected (HTTP {status}): {body}");
        }

        let token: TokenResponse =
            serde_json::from_str(&body).context("failed to decode token response")?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        Ok(AccessToken {
            value: token.access_token,
            expires_at: Instant::now().checked_add(lifetime),
        })
    }

    /// Sends an authorized GET request.
    ///
    /// Retries up to `MAX_RETRIES` times on HTTP 429, and once with a new
    /// token on HTTP 401.
    #[instrument(skip_all)]
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("failed to join URL path: {path}"))?;

        let mut retries = 0u32;
        let mut renewed = false;
        loop {
            let token = self.access_token().await?;

            tracing::debug!(path, "spotify request");
            let response = self
                .http_client
                .get(url.clone())
                .bearer_auth(&token)
                .query(query)
                .send()
                .await
                .with_context(|| format!("request failed: {path}"))?;

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                retries = retries.saturating_add(1);
                if retries > MAX_RETRIES {
                    bail!("Spotify rate limit exceeded after {MAX_RETRIES} retries: {path}");
                }
                let wait = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map_or_else(
                        || RETRY_BACKOFF.saturating_mul(retries),
                        Duration::from_secs,
                    )
                    .min(MAX_RETRY_AFTER);
                tracing::warn!(
                    retry = retries,
                    max_retries = MAX_RETRIES,
                    wait_secs = wait.as_secs(),
                    "Spotify rate limited (429), retrying"
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED && !renewed {
                renewed = true;
                tracing::debug!("Spotify token rejected, requesting a new one");
                self.forget_token().await;
                continue;
            }

            let body = response
                .text()
                .await
                .with_context(|| format!("failed to read response body: {path}"))?;

            if !status.is_success() {
                if let Ok(error_response) = serde_json::from_str::<SpotifyErrorResponse>(&body) {
                    bail!(
                        "Spotify error (HTTP {status}): {}",
                        error_response.error.message
                    );
                }
                bail!("Spotify error (HTTP {status}): {body}");
            }

            return serde_json::from_str(&body)
                .with_context(|| format!("failed to decode JSON response: {path}"));
        }
    }

    fn cached(&self, key: &str) -> Option<Soundtrack> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = cache
            .get(key)
            .filter(|entry| entry.expires_at.is_some_and(|at| Instant::now() < at))
            .map(|entry| entry.soundtrack.clone());
        if fresh.is_none() && cache.remove(key).is_some() {
            tracing::debug!(title = key, "cached soundtrack expired");
        }
        fresh
    }

    fn remember(&self, key: String, soundtrack: &Soundtrack) {
        let entry = CacheEntry {
            expires_at: Instant::now().checked_add(self.cache_ttl),
            soundtrack: soundtrack.clone(),
        };
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        let params = [
            ("q", String::from(query)),
            ("type", String::from("track")),
            ("limit", clamp_limit(limit).to_string()),
        ];
        let response: SearchResponse = self.get_json("search", &params).await?;
        Ok(response.tracks.map(|page| page.items).unwrap_or_default())
    }
}

/// Strips colons and dashes and collapses whitespace.
fn normalize_title(title: &str) -> String {
    title
        .replace([':', '-', '\u{2013}', '\u{2014}'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Soundtrack search queries, most specific first.
fn search_queries(title: &str) -> Vec<String> {
    let mut queries = vec![
        format!("{title} Tamil soundtrack"),
        format!("{title} soundtrack"),
        format!("{title} Tamil songs"),
        format!("{title} music"),
        String::from(title),
    ];
    let mut words = title.split_whitespace();
    if let Some(first) = words.next()
        && words.next().is_some()
    {
        queries.push(format!("{first} Tamil song"));
    }
    queries
}

/// Keeps tracks that mention `title`, or all of them when none does.
fn relevant_tracks(tracks: Vec<Track>, title: &str) -> Vec<Track> {
    let needle = title.to_lowercase();
    let matching: Vec<Track> = tracks.iter().filter(|t| t.mentions(&needle)).cloned().collect();
    if matching.is_empty() {
        tracks
    } else {
        matching
    }
}

/// Spotify IDs are base-62 strings.
fn check_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!("invalid Spotify {kind} ID: {id:?}");
    }
    Ok(())
}

fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_LIMIT)
}

impl LocalSoundtrackApi for SoundtrackClient {
    #[instrument(skip_all)]
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        self.search(query, limit).await
    }

    #[instrument(skip_all, fields(title = title))]
    async fn movie_soundtrack(&self, title: &str) -> Result<Soundtrack> {
        let normalized = normalize_title(title);
        if normalized.is_empty() {
            bail!("movie title is required");
        }
        let key = normalized.to_lowercase();
        if let Some(hit) = self.cached(&key) {
            tracing::debug!("using cached soundtrack");
            return Ok(hit);
        }

        // Fail fast on bad credentials instead of once per query.
        self.access_token().await?;

        for query in search_queries(&normalized) {
            match self.search(&query, SEARCH_LIMIT).await {
                Ok(tracks) if !tracks.is_empty() => {
                    tracing::debug!(query = query.as_str(), count = tracks.len(), "soundtrack found");
                    let soundtrack = Soundtrack {
                        title: normalized.clone(),
                        tracks: relevant_tracks(tracks, &normalized),
                        query,
                        fallback: false,
                    };
                    self.remember(key, &soundtrack);
                    return Ok(soundtrack);
                }
                Ok(_) => tracing::debug!(query = query.as_str(), "no tracks"),
                Err(e) => {
                    tracing::warn!(query = query.as_str(), "soundtrack search failed: {e:#}");
                }
            }
        }

        tracing::info!("no soundtrack match, using popular Tamil songs");
        let tracks = self
            .search(FALLBACK_QUERY, SEARCH_LIMIT)
            .await
            .context("fallback soundtrack search failed")?;
        let soundtrack = Soundtrack {
            title: normalized,
            query: String::from(FALLBACK_QUERY),
            fallback: true,
            tracks,
        };
        self.remember(key, &soundtrack);
        Ok(soundtrack)
    }

    #[instrument(skip_all, fields(playlist = playlist_id))]
    async fn playlist_tracks(&self, playlist_id: &str, limit: u32) -> Result<Vec<Track>> {
        check_id("playlist", playlist_id)?;
        let path = format!("playlists/{playlist_id}/tracks");
        let query = [("limit", clamp_limit(limit).to_string())];
        let page: Paging<PlaylistEntry> = self.get_json(&path, &query).await?;
        Ok(page.items.into_iter().filter_map(|e| e.track).collect())
    }

    #[instrument(skip_all, fields(album = album_id))]
    async fn album_tracks(&self, album_id: &str, limit: u32) -> Result<Vec<Track>> {
        check_id("album", album_id)?;
        let path = format!("albums/{album_id}/tracks");
        let query = [("limit", clamp_limit(limit).to_string())];
        let page: Paging<Track> = self.get_json(&path, &query).await?;
        let album: Album = self.get_json(&format!("albums/{album_id}"), &[]).await?;
        Ok(page
            .items
            .into_iter()
            .map(|track| Track {
                album: Some(album.clone()),
                ..track
            })
            .collect())
    }
}
