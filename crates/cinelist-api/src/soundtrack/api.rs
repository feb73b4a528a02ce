//! `SoundtrackApi` trait definition.
#![allow(clippy::future_not_send)]

use anyhow::Result;

use super::types::{Soundtrack, Track};

/// Soundtrack lookup trait.
///
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(SoundtrackApi: Send)]
pub trait LocalSoundtrackApi {
    /// Searches tracks matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication, the HTTP request or JSON parsing fails.
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>>;

    /// Finds the soundtrack of a movie by title.
    ///
    /// Results are cached per title until the cache lifetime elapses.
    ///
    /// # Errors
    ///
    /// Returns an error if the title is blank, authentication fails, or
    /// even the generic fallback search fails.
    async fn movie_soundtrack(&self, title: &str) -> Result<Soundtrack>;

    /// Lists the tracks of a playlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is malformed or the request fails.
    async fn playlist_tracks(&self, playlist_id: &str, limit: u32) -> Result<Vec<Track>>;

    /// Lists the tracks of an album, each carrying the album itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is malformed or the request fails.
    async fn album_tracks(&self, album_id: &str, limit: u32) -> Result<Vec<Track>>;
}
