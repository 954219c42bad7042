//! Path resolution for cibform
//!
//! # Environment Variables
//!
//! - `CIBFORM_CONFIG` - Override the settings file (e.g. `~/dotfiles/cibform.toml`)
//!
//! # Resolution Priority
//!
//! For config_file():
//! 1. `--config` flag
//! 2. `CIBFORM_CONFIG` environment variable
//! 3. `<config_dir>/cibform/config.toml` (`~/.config` on Linux)

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for settings file override
pub const ENV_CONFIG: &str = "CIBFORM_CONFIG";

/// Settings file name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get the cibform config directory path
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join("cibform"))
}

/// Resolve the settings file to read
///
/// `flag` is the value of `--config`, `env` the value of `CIBFORM_CONFIG`.
pub fn config_file(flag: Option<&Path>, env: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Some(value) = env.filter(|v| !v.is_empty()) {
        let path = expand(value);
        log::debug!("Using settings from {ENV_CONFIG}: {}", path.display());
        return Ok(path);
    }
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Expand `~` and environment variables in a path
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
