//! Movie soundtrack lookup on Spotify.
//!
//! Authenticates with the client-credentials flow and finds tracks for a
//! movie by trying a series of search queries, falling back to popular
//! Tamil songs. Playlists and albums can also be listed directly.

mod api;
mod client;
mod types;

#[allow(clippy::module_name_repetitions)]
pub use api::{LocalSoundtrackApi, SoundtrackApi};
#[allow(clippy::module_name_repetitions)]
pub use client::{SoundtrackClient, SoundtrackClientBuilder};
pub use types::{
    Album, Artist, ExternalUrls, Image, Soundtrack, SpotifyError, SpotifyErrorResponse, Track,
};
