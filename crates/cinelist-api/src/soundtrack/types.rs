//! Spotify response types.

use serde::Deserialize;

/// Client-credentials token response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    /// Bearer token.
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: u64,
}

/// Token endpoint error (`{"error":"invalid_client", ...}`).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenErrorResponse {
    /// OAuth error code.
    pub error: String,
    /// Human-readable reason.
    pub error_description: Option<String>,
}

/// Web API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyErrorResponse {
    /// Error details.
    pub error: SpotifyError,
}

/// Web API error details.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyError {
    /// HTTP status code.
    pub status: u16,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

/// A page of results.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Paging<T> {
    /// Entries on this page.
    pub items: Vec<T>,
}

/// `search?type=track` response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResponse {
    /// Matching tracks.
    pub tracks: Option<Paging<Track>>,
}

/// Playlist entry; `track` is null for removed or local tracks.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PlaylistEntry {
    /// The track.
    pub track: Option<Track>,
}

/// A track.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Track {
    /// Spotify track ID.
    pub id: Option<String>,
    /// Track name.
    #[serde(default)]
    pub name: String,
    /// Performing artists.
    #[serde(default)]
    pub artists: Vec<Artist>,
    /// Album; absent on album track listings until attached.
    pub album: Option<Album>,
    /// Duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// 30-second preview MP3.
    pub preview_url: Option<String>,
    /// Links to the Spotify app.
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl Track {
    /// Artist names joined with ", ".
    #[must_use]
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether the track name, album name or an artist contains `needle`
    /// (already lowercased).
    pub(crate) fn mentions(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .album
                .as_ref()
                .is_some_and(|a| a.name.to_lowercase().contains(needle))
            || self
                .artists
                .iter()
                .any(|a| a.name.to_lowercase().contains(needle))
    }
}

/// A performing artist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artist {
    /// Spotify artist ID.
    pub id: Option<String>,
    /// Artist name.
    #[serde(default)]
    pub name: String,
}

/// An album.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Album {
    /// Spotify album ID.
    pub id: Option<String>,
    /// Album name.
    #[serde(default)]
    pub name: String,
    /// Release date (year, year-month or full date).
    pub release_date: Option<String>,
    /// Cover art, largest first.
    #[serde(default)]
    pub images: Vec<Image>,
}

/// Cover art image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Image {
    /// Image URL.
    pub url: String,
    /// Width in pixels.
    pub width: Option<u32>,
    /// Height in pixels.
    pub height: Option<u32>,
}

/// External links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExternalUrls {
    /// Spotify web player link.
    pub spotify: Option<String>,
}

/// Tracks found for a movie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soundtrack {
    /// Title as looked up.
    pub title: String,
    /// Search query that produced the tracks.
    pub query: String,
    /// Whether the tracks come from the generic fallback search.
    pub fallback: bool,
    /// Found tracks.
    pub tracks: Vec<Track>,
}
