//! Config directory resolution.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolves the config file path.
///
/// - If `dir` is `Some`, returns `{dir}/config.toml`.
/// - Otherwise returns `$XDG_CONFIG_HOME/cinelist/config.toml`, where an
///   unset `XDG_CONFIG_HOME` means `~/.config`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined (when `dir` is `None`).
pub fn resolve_config_path(dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.join(CONFIG_FILE_NAME));
    }

    let base = match std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => {
            let home = std::env::var("HOME").context("HOME environment variable is not set")?;
            PathBuf::from(home).join(".config")
        }
    };
    Ok(base.join("cinelist").join(CONFIG_FILE_NAME))
}
