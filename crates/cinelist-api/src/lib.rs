//! API client library for cinelist.
//!
//! Provides the client for the favorites/watchlist/auth backend, the
//! read-only TMDB movie catalog client and the Spotify soundtrack client.

/// Backend (auth + list) API client.
pub mod backend;

/// TMDB catalog API client.
pub mod catalog;

/// Spotify soundtrack client.
pub mod soundtrack;
