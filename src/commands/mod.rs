//! Command implementations.

pub mod list;
pub mod plan;
pub mod sync;

use crate::config::Settings;
use anyhow::{Context as _, Result};
use bundlekit::backend::git::GitBackend;
use bundlekit::{Directive, SyncMode, directive};

/// Read the directives out of the configured vimrc.
pub fn load_directives(settings: &Settings) -> Result<Vec<Directive>> {
    let path = &settings.vimrc_path;
    let directives = directive::parse_file(path)
        .with_context(|| format!("Could not read bundle directives from {}", path.display()))?;
    log::debug!("{} directives in {}", directives.len(), path.display());
    Ok(directives)
}

/// The git backend for this run.
pub fn git_backend(settings: &Settings, mode: &SyncMode) -> Result<GitBackend> {
    let mut git = GitBackend::new().with_retry(settings.retry_policy());
    if let SyncMode::Submodule { superproject } = mode {
        git = git.with_superproject(superproject);
    }
    if !git.is_available() {
        anyhow::bail!("git is not installed or not on PATH");
    }
    Ok(git)
}
