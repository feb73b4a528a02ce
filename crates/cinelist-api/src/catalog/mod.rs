//! TMDB catalog client module.
//!
//! Read-only access to the TMDB API v3 movie endpoints: discover,
//! search, details, similar titles and the genre list.

mod api;
mod client;
mod rate_limiter;
mod types;

#[allow(clippy::module_name_repetitions)]
pub use api::{CatalogApi, LocalCatalogApi};
#[allow(clippy::module_name_repetitions)]
pub use client::{CatalogClient, CatalogClientBuilder};
pub use types::{
    DiscoverParams, Genre, GenreList, MovieDetails, MoviePage, MovieSummary, SearchParams,
    TmdbErrorResponse,
};
