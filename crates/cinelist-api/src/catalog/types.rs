//! Catalog response types and query parameters.

use serde::Deserialize;

use crate::backend::ListItem;

/// Default original-language filter (Tamil).
const DEFAULT_ORIGINAL_LANGUAGE: &str = "ta";

/// Default release region.
const DEFAULT_REGION: &str = "IN";

/// Default discover ordering.
const DEFAULT_SORT_BY: &str = "popularity.desc";

// --- Movie lists ---

/// A page of movies (`discover/movie`, `search/movie`, `movie/{id}/similar`).
#[derive(Debug, Clone, Deserialize)]
pub struct MoviePage {
    /// Current page number.
    #[serde(default)]
    pub page: u32,
    /// Movies on this page.
    #[serde(default)]
    pub results: Vec<MovieSummary>,
    /// Total number of pages.
    #[serde(default)]
    pub total_pages: u32,
    /// Total number of results.
    #[serde(default)]
    pub total_results: u32,
}

/// A movie as it appears in list results.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieSummary {
    /// TMDB movie ID.
    pub id: u64,
    /// Localized title.
    #[serde(default)]
    pub title: String,
    /// Original title.
    pub original_title: Option<String>,
    /// Original language (ISO 639-1).
    pub original_language: Option<String>,
    /// Release date (YYYY-MM-DD or empty).
    pub release_date: Option<String>,
    /// Overview text.
    pub overview: Option<String>,
    /// Popularity score.
    pub popularity: Option<f64>,
    /// Vote average.
    pub vote_average: Option<f64>,
    /// Vote count.
    pub vote_count: Option<u32>,
    /// Genre IDs.
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    /// Poster image path.
    pub poster_path: Option<String>,
    /// Backdrop image path.
    pub backdrop_path: Option<String>,
}

impl MovieSummary {
    /// Converts to the shape stored in favorites and the watchlist.
    #[must_use]
    pub fn to_list_item(&self) -> ListItem {
        ListItem {
            id: self.id,
            title: self.title.clone(),
            poster_path: self.poster_path.clone(),
            release_date: non_empty(self.release_date.as_ref()),
            vote_average: self.vote_average,
            overview: non_empty(self.overview.as_ref()),
        }
    }
}

// --- Movie details ---

/// Response from `movie/{movie_id}` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetails {
    /// TMDB movie ID.
    pub id: u64,
    /// Localized title.
    #[serde(default)]
    pub title: String,
    /// Original title.
    pub original_title: Option<String>,
    /// Original language (ISO 639-1).
    pub original_language: Option<String>,
    /// Release date.
    pub release_date: Option<String>,
    /// Overview text.
    pub overview: Option<String>,
    /// Tagline.
    pub tagline: Option<String>,
    /// Runtime in minutes.
    pub runtime: Option<u32>,
    /// Release status (e.g., "Released").
    pub status: Option<String>,
    /// Vote average.
    pub vote_average: Option<f64>,
    /// Vote count.
    pub vote_count: Option<u32>,
    /// Genres.
    #[serde(default)]
    pub genres: Vec<Genre>,
    /// Poster image path.
    pub poster_path: Option<String>,
    /// Backdrop image path.
    pub backdrop_path: Option<String>,
}

impl MovieDetails {
    /// Converts to the shape stored in favorites and the watchlist.
    #[must_use]
    pub fn to_list_item(&self) -> ListItem {
        ListItem {
            id: self.id,
            title: self.title.clone(),
            poster_path: self.poster_path.clone(),
            release_date: non_empty(self.release_date.as_ref()),
            vote_average: self.vote_average,
            overview: non_empty(self.overview.as_ref()),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

// --- Genres ---

/// Genre entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Genre {
    /// Genre ID.
    pub id: u32,
    /// Genre name.
    pub name: String,
}

/// Response from `genre/movie/list` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GenreList {
    /// All movie genres.
    #[serde(default)]
    pub genres: Vec<Genre>,
}

// --- Error Response ---

/// TMDB API error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbErrorResponse {
    /// TMDB error code.
    pub status_code: u32,
    /// Error message.
    pub status_message: String,
    /// Success flag (always false for errors).
    #[serde(default)]
    pub success: bool,
}

// --- Parameters ---

/// Parameters for `discover/movie` endpoint.
#[derive(Debug, Clone)]
pub struct DiscoverParams {
    /// Original-language filter (default: "ta").
    pub original_language: String,
    /// Release region (default: "IN").
    pub region: Option<String>,
    /// Genre filter.
    pub genre_ids: Vec<u32>,
    /// Match any listed genre instead of all of them.
    pub any_genre: bool,
    /// Minimum vote count.
    pub min_vote_count: Option<u32>,
    /// Sort order (default: "popularity.desc").
    pub sort_by: String,
    /// Result page (1-500, default: 1).
    pub page: u32,
}

impl Default for DiscoverParams {
    fn default() -> Self {
        Self {
            original_language: String::from(DEFAULT_ORIGINAL_LANGUAGE),
            region: Some(String::from(DEFAULT_REGION)),
            genre_ids: Vec::new(),
            any_genre: false,
            min_vote_count: None,
            sort_by: String::from(DEFAULT_SORT_BY),
            page: 1,
        }
    }
}

impl DiscoverParams {
    /// Creates params with the default language, region and ordering.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the original-language filter.
    #[must_use]
    pub fn original_language(mut self, language: impl Into<String>) -> Self {
        self.original_language = language.into();
        self
    }

    /// Sets the release region; an empty string disables the filter.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        let region = region.into();
        self.region = if region.is_empty() { None } else { Some(region) };
        self
    }

    /// Restricts results to a genre.
    #[must_use]
    pub fn genre(mut self, genre_id: u32) -> Self {
        self.genre_ids.push(genre_id);
        self
    }

    /// Sets the result page.
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Value of the `with_genres` query parameter, if any.
    ///
    /// TMDB reads `,` as AND and `|` as OR.
    pub(crate) fn with_genres(&self) -> Option<String> {
        if self.genre_ids.is_empty() {
            return None;
        }
        let sep = if self.any_genre { "|" } else { "," };
        let joined = self
            .genre_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(sep);
        Some(joined)
    }
}

/// Parameters for `search/movie` endpoint.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Search query (required).
    pub query: String,
    /// Original-language filter.
    pub original_language: Option<String>,
    /// Region filter (ISO 3166-1).
    pub region: Option<String>,
    /// Result page (1-500, default: 1).
    pub page: u32,
    /// Include adult content.
    pub include_adult: bool,
}

impl SearchParams {
    /// Creates search params with the given query.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            original_language: None,
            region: None,
            page: 1,
            include_adult: false,
        }
    }

    /// Restricts results to an original language.
    #[must_use]
    pub fn original_language(mut self, language: impl Into<String>) -> Self {
        self.original_language = Some(language.into());
        self
    }

    /// Restricts results to a region.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the result page.
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}
