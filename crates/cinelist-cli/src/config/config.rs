//! `AppConfig` struct and TOML loading.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// List and account backend settings.
    #[serde(default)]
    pub backend: BackendConfig,
    /// TMDB catalog settings.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Spotify soundtrack settings.
    #[serde(default)]
    pub soundtrack: SoundtrackConfig,
}

/// `[backend]` section.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL override; the client default is used when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    /// Parsed base URL, if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn base_url(&self) -> Result<Option<Url>> {
        parse_base_url(self.base_url.as_deref())
    }

    /// Request timeout.
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[catalog]` section.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Base URL override; the TMDB v3 endpoint is used when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Original-language filter for discover and search.
    #[serde(default = "default_language")]
    pub language: String,
    /// Release region; empty disables the filter.
    #[serde(default = "default_region")]
    pub region: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            language: default_language(),
            region: default_region(),
        }
    }
}

impl CatalogConfig {
    /// Parsed base URL, if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn base_url(&self) -> Result<Option<Url>> {
        parse_base_url(self.base_url.as_deref())
    }
}

/// `[soundtrack]` section.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct SoundtrackConfig {
    /// Web API base URL override.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Token endpoint override.
    #[serde(default)]
    pub token_url: Option<String>,
    /// Curated playlist IDs by movie title, used instead of searching.
    #[serde(default)]
    pub playlists: BTreeMap<String, String>,
}

impl SoundtrackConfig {
    /// Parsed base URL, if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn base_url(&self) -> Result<Option<Url>> {
        parse_base_url(self.base_url.as_deref())
    }

    /// Parsed token endpoint, if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if `token_url` is not a valid URL.
    pub fn token_url(&self) -> Result<Option<Url>> {
        self.token_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|raw| Url::parse(raw).with_context(|| format!("invalid token_url: {raw}")))
            .transpose()
    }

    /// Curated playlist for `title`, compared case-insensitively.
    #[must_use]
    pub fn playlist_for(&self, title: &str) -> Option<&str> {
        let title = title.trim();
        self.playlists
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(title))
            .map(|(_, id)| id.as_str())
    }
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_language() -> String {
    String::from("ta")
}

fn default_region() -> String {
    String::from("IN")
}

/// Parses a base URL, adding the trailing slash `Url::join` needs.
fn parse_base_url(raw: Option<&str>) -> Result<Option<Url>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let normalized = if raw.ends_with('/') {
        String::from(raw)
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&normalized).with_context(|| format!("invalid base_url: {raw}"))?;
    Ok(Some(url))
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_default_config() {
        // Arrange & Act
        let config = AppConfig::default();

        // Assert
        assert!(config.backend.base_url.is_none());
        assert_eq!(config.backend.timeout(), Duration::from_secs(10));
        assert_eq!(config.catalog.language, "ta");
        assert_eq!(config.catalog.region, "IN");
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        // Act
        let config = AppConfig::load(&path).unwrap();

        // Assert
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_partial_config() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[backend]\nbase_url = \"http://localhost:5000/api\"\n\n[catalog]\nregion = \"\"\n",
        )
        .unwrap();

        // Act
        let config = AppConfig::load(&path).unwrap();

        // Assert
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(
            config.backend.base_url().unwrap().unwrap().as_str(),
            "http://localhost:5000/api/"
        );
        assert_eq!(config.catalog.language, "ta");
        assert!(config.catalog.region.is_empty());
    }

    #[test]
    fn test_load_invalid_toml_errors() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend\n").unwrap();

        // Act
        let result = AppConfig::load(&path);

        // Assert
        assert!(result.unwrap_err().to_string().contains("failed to parse"));
    }

    #[test]
    fn test_invalid_base_url_errors() {
        // Arrange
        let config = CatalogConfig {
            base_url: Some(String::from("not a url")),
            ..CatalogConfig::default()
        };

        // Act
        let result = config.base_url();

        // Assert
        assert!(result.unwrap_err().to_string().contains("invalid base_url"));
    }

    #[test]
    fn test_load_soundtrack_playlists() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[soundtrack]\ntoken_url = \"http://localhost:9000/api/token\"\n\n\
             [soundtrack.playlists]\n\"Leo\" = \"11YJfivZjEaEUU9lJmeidh\"\n",
        )
        .unwrap();

        // Act
        let config = AppConfig::load(&path).unwrap();

        // Assert
        assert_eq!(
            config.soundtrack.playlist_for(" leo "),
            Some("11YJfivZjEaEUU9lJmeidh")
        );
        assert!(config.soundtrack.playlist_for("Jailer").is_none());
        assert_eq!(
            config.soundtrack.token_url().unwrap().unwrap().as_str(),
            "http://localhost:9000/api/token"
        );
        assert!(config.soundtrack.base_url().unwrap().is_none());
    }
}
