//! Reader config file lookup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rucfs::ReaderConfig;

/// Default config location (~/.config/rucfs/config.toml).
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rucfs").join("config.toml"))
}

/// Load the reader config.
///
/// An explicit path must exist. The default path is optional; when it is
/// missing the built-in defaults apply.
pub fn load(explicit: Option<&Path>) -> Result<ReaderConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_path() {
            Some(path) if path.exists() => path,
            _ => {
                tracing::debug!("no reader config, using defaults");
                return Ok(ReaderConfig::default());
            }
        },
    };
    from_file(&path)
}

fn from_file(path: &Path) -> Result<ReaderConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = ReaderConfig::from_toml(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "loaded reader config");
    Ok(config)
}
