//! `CatalogClient` - TMDB catalog client implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::instrument;
use url::Url;

use super::api::LocalCatalogApi;
use super::rate_limiter::RateLimiter;
use super::types::{
    DiscoverParams, GenreList, MovieDetails, MoviePage, SearchParams, TmdbErrorResponse,
};

/// Default base URL for TMDB API v3.
const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3/";

/// Maximum number of retries for HTTP 429 responses.
const MAX_RETRIES: u32 = 3;

/// Backoff duration between retries.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum vote count for genre recommendations.
const RECOMMEND_MIN_VOTES: u32 = 100;

/// TMDB catalog client.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct CatalogClient {
    /// HTTP client.
    http_client: Client,
    /// Base URL for API requests.
    base_url: Url,
    /// Bearer API token.
    api_token: String,
    /// Request pacing.
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

/// Builder for `CatalogClient`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct CatalogClientBuilder {
    base_url: Option<Url>,
    api_token: Option<String>,
    user_agent: Option<String>,
    min_interval: Option<Duration>,
    timeout: Option<Duration>,
}

impl CatalogClientBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            base_url: None,
            api_token: None,
            user_agent: None,
            min_interval: None,
            timeout: None,
        }
    }

    /// Overrides the base URL (for wiremock in tests).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the API bearer token (required).
    #[must_use]
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Sets the User-Agent (required).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the minimum request interval (default: 25ms).
    #[must_use]
    pub const fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = Some(interval);
        self
    }

    /// Sets the per-request timeout (default: 10s).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - `api_token` is not set or blank.
    /// - `user_agent` is not set.
    /// - `reqwest::Client` build fails.
    pub fn build(self) -> Result<CatalogClient> {
        let api_token = self
            .api_token
            .filter(|t| !t.trim().is_empty())
            .context("api_token is required")?;
        let user_agent = self.user_agent.context("user_agent is required")?;

        let base_url = if let Some(url) = self.base_url {
            url
        } else {
            Url::parse(DEFAULT_BASE_URL).context("invalid default base URL")?
        };

        let rate_limiter = self
            .min_interval
            .map_or_else(RateLimiter::default_interval, RateLimiter::new);

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .gzip(true)
            .build()
            .context("failed to build HTTP client")?;

        Ok(CatalogClient {
            http_client,
            base_url,
            api_token,
            rate_limiter: Arc::new(Mutex::new(rate_limiter)),
        })
    }
}

impl CatalogClient {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> CatalogClientBuilder {
        CatalogClientBuilder::new()
    }

    /// Sends a GET request with Bearer auth, query params, and rate limiting.
    /// Retries up to `MAX_RETRIES` times on HTTP 429.
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
        loop {
            self.rate_limiter.lock().await.acquire().await;

            tracing::debug!(path, "catalog request");
            let response = self
                .http_client
                .get(url.clone())
                .bearer_auth(&self.api_token)
                .query(query)
                .send()
                .await
                .with_context(|| format!("request failed: {path}"))?;

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                retries = retries.saturating_add(1);
                if retries > MAX_RETRIES {
                    bail!("TMDB rate limit exceeded after {MAX_RETRIES} retries: {path}");
                }
                tracing::warn!(
                    retry = retries,
                    max_retries = MAX_RETRIES,
                    "TMDB rate limited (429), retrying"
                );
                tokio::time::sleep(RETRY_BACKOFF.saturating_mul(retries)).await;
                continue;
            }

            let body = response
                .text()
                .await
                .with_context(|| format!("failed to read response body: {path}"))?;

            if !status.is_success() {
                if let Ok(error_response) = serde_json::from_str::<TmdbErrorResponse>(&body) {
                    bail!(
                        "TMDB error (HTTP {status}): code={}, message={}",
                        error_response.status_code,
                        error_response.status_message,
                    );
                }
                bail!("TMDB error (HTTP {status}): {body}");
            }

            return serde_json::from_str(&body)
                .with_context(|| format!("failed to decode JSON response: {path}"));
        }
    }
}

/// Builds the `discover/movie` query string.
fn discover_query(params: &DiscoverParams) -> Vec<(&'static str, String)> {
    let mut query: Vec<(&str, String)> = vec![
        ("with_original_language", params.original_language.clone()),
        ("sort_by", params.sort_by.clone()),
        ("page", params.page.to_string()),
    ];
    if let Some(ref region) = params.region {
        query.push(("region", region.clone()));
    }
    if let Some(genres) = params.with_genres() {
        query.push(("with_genres", genres));
    }
    if let Some(votes) = params.min_vote_count {
        query.push(("vote_count.gte", votes.to_string()));
    }
    query
}

impl LocalCatalogApi for CatalogClient {
    #[instrument(skip_all)]
    async fn discover_movies(&self, params: &DiscoverParams) -> Result<MoviePage> {
        self.get_json("discover/movie", &discover_query(params))
            .await
    }

    #[instrument(skip_all)]
    async fn search_movies(&self, params: &SearchParams) -> Result<MoviePage> {
        let mut query: Vec<(&str, String)> = vec![
            ("query", params.query.clone()),
            ("page", params.page.to_string()),
            ("include_adult", params.include_adult.to_string()),
        ];
        if let Some(ref language) = params.original_language {
            query.push(("with_original_language", language.clone()));
        }
        if let Some(ref region) = params.region {
            query.push(("region", region.clone()));
        }

        self.get_json("search/movie", &query).await
    }

    #[instrument(skip_all)]
    async fn movie_details(&self, movie_id: u64, language: &str) -> Result<MovieDetails> {
        let path = format!("movie/{movie_id}");
        let query = [("language", String::from(language))];
        self.get_json(&path, &query).await
    }

    #[instrument(skip_all)]
    async fn similar_movies(&self, movie_id: u64, language: &str, page: u32) -> Result<MoviePage> {
        let path = format!("movie/{movie_id}/similar");
        let query = [
            ("language", String::from(language)),
            ("page", page.to_string()),
        ];
        self.get_json(&path, &query).await
    }

    #[instrument(skip_all)]
    async fn recommend_movies(
        &self,
        genre_ids: &[u32],
        base: &DiscoverParams,
    ) -> Result<MoviePage> {
        if genre_ids.is_empty() {
            bail!("at least one genre is required for recommendations");
        }
        let params = DiscoverParams {
            genre_ids: genre_ids.to_vec(),
            any_genre: true,
            min_vote_count: Some(RECOMMEND_MIN_VOTES),
            ..base.clone()
        };
        self.discover_movies(&params).await
    }

    #[instrument(skip_all)]
    async fn genres(&self, language: &str) -> Result<GenreList> {
        let query = [("language", String::from(language))];
        self.get_json("genre/movie/list", &query).await
    }
}
