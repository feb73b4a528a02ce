//! `CatalogApi` trait definition.
#![allow(clippy::future_not_send)]

use anyhow::Result;

use super::types::{DiscoverParams, GenreList, MovieDetails, MoviePage, SearchParams};

/// Movie catalog trait.
///
/// Abstracts catalog lookups for mock substitution in tests.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(CatalogApi: Send)]
pub trait LocalCatalogApi {
    /// Lists movies by original language, region and genre.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn discover_movies(&self, params: &DiscoverParams) -> Result<MoviePage>;

    /// Searches movies by title.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn search_movies(&self, params: &SearchParams) -> Result<MoviePage>;

    /// Fetches full details of one movie.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn movie_details(&self, movie_id: u64, language: &str) -> Result<MovieDetails>;

    /// Fetches movies similar to the given one.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn similar_movies(&self, movie_id: u64, language: &str, page: u32) -> Result<MoviePage>;

    /// Recommends well-rated movies matching any of `genre_ids`.
    ///
    /// Uses the language, region and page of `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn recommend_movies(&self, genre_ids: &[u32], base: &DiscoverParams)
    -> Result<MoviePage>;

    /// Fetches the movie genre list.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn genres(&self, language: &str) -> Result<GenreList>;
}
