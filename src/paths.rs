//! Centralized path resolution for vimbundle
//!
//! Everything vimbundle touches hangs off the dotfiles directory, which
//! defaults to the home directory so a plain `~/.vimrc` + `~/.vim` setup
//! works without configuration.
//!
//! # Environment Variables
//!
//! - `VIMBUNDLE_DOTFILES` - Override the dotfiles directory (e.g., `~/dotfiles`)
//!
//! # Path Resolution Priority
//!
//! For dotfiles_dir():
//! 1. `VIMBUNDLE_DOTFILES` environment variable
//! 2. Home directory

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for dotfiles directory override
pub const ENV_DOTFILES: &str = "VIMBUNDLE_DOTFILES";

/// Name of the optional config file inside the dotfiles directory
pub const CONFIG_FILE: &str = ".vimbundle.conf";

/// Get the dotfiles directory path
pub fn dotfiles_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_DOTFILES) {
        let path = expand(&dir);
        log::debug!("Using dotfiles dir from {}: {}", ENV_DOTFILES, path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    log::debug!("Using home as dotfiles dir: {}", home.display());
    Ok(home)
}

/// Default config file for a dotfiles directory
pub fn default_config_file(dotfiles: &Path) -> PathBuf {
    dotfiles.join(CONFIG_FILE)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Home directory as a string, for `~` expansion.
pub fn home_string() -> Option<String> {
    dirs::home_dir().map(|p| p.to_string_lossy().into_owned())
}

// ============================================================================
// Tests
// ============================================================================
