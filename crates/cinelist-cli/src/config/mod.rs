//! Application configuration module.
//!
//! Reads the TOML config file holding backend, catalog and soundtrack
//! endpoints, catalog defaults and curated soundtrack playlists.

#[allow(clippy::module_inception)]
mod config;
mod paths;

#[allow(clippy::module_name_repetitions)]
pub use config::AppConfig;
pub use paths::resolve_config_path;
