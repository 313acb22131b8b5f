//! Version-control abstraction for bundle operations.
//!
//! The [`Vcs`] trait is the only way the reconciler talks to version control,
//! allowing for different implementations (the real `git` CLI, fakes for
//! testing).

pub mod git;

#[cfg(test)]
pub(crate) mod fake;

use crate::error::Result;
use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};

/// Backend trait for version-control operations on bundle directories.
///
/// Mutating operations fail with [`crate::Error::Command`]. Queries return
/// `Ok(None)` / `Ok(false)` when the answer is simply "no".
pub trait Vcs: Send + Sync {
    /// Clone `url` into `dir`. The parent of `dir` must exist.
    fn clone_repo(&self, url: &str, dir: &Path) -> Result<()>;

    /// Fetch branches and tags from origin.
    fn fetch_updates(&self, dir: &Path) -> Result<()>;

    /// Check out a branch, tag or commit.
    fn checkout_ref(&self, dir: &Path, git_ref: &str) -> Result<()>;

    /// Pull `branch` from origin into the current branch.
    fn pull_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Origin URL of the working copy at `dir`, or `None` if `dir` is not one.
    fn current_origin_url(&self, dir: &Path) -> Result<Option<String>>;

    /// Name of the checked-out branch, or `None` on a detached head.
    fn current_branch(&self, dir: &Path) -> Result<Option<String>>;

    /// Whether a local branch with this name exists.
    fn local_branch_exists(&self, dir: &Path, branch: &str) -> Result<bool>;

    /// Origin's default branch name.
    fn default_branch(&self, dir: &Path) -> Result<String>;

    /// Resolve a path inside the working copy's git directory.
    fn git_path(&self, dir: &Path, relative: &str) -> Result<PathBuf>;

    /// Register `url` as a submodule checked out at `dir`.
    fn add_submodule(&self, url: &str, dir: &Path) -> Result<()>;

    /// Initialize submodules registered in the superproject.
    fn init_submodules(&self) -> Result<()>;

    /// Check out registered submodules.
    fn update_submodules(&self) -> Result<()>;

    /// Stage `dir` in the superproject.
    fn stage_path(&self, dir: &Path) -> Result<()>;

    /// Remove `dir` from the superproject's index, keeping the files.
    ///
    /// A path that is not in the index is left alone.
    fn stage_removed_path(&self, dir: &Path) -> Result<()>;

    /// Human-readable version (`git describe --tags`), if any.
    fn describe_version(&self, dir: &Path) -> Result<Option<String>>;

    /// Commit date of `HEAD`.
    fn last_commit_date(&self, dir: &Path) -> Result<Option<DateTime<FixedOffset>>>;
}
