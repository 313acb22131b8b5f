//! Real version-control backend using `git` commands.

use crate::backend::Vcs;
use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, with_retry};
use chrono::{DateTime, FixedOffset};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Backend that executes real `git` commands.
pub struct GitBackend {
    /// Path to the git executable
    git_path: PathBuf,
    /// Dotfiles repository for submodule operations
    superproject: Option<PathBuf>,
    /// Retry policy for clone and fetch
    retry: RetryPolicy,
    /// Extra `-c key=value` settings for every command
    config: Vec<(String, String)>,
}

impl GitBackend {
    /// Create a backend using `git` from `PATH`.
    pub fn new() -> Self {
        Self {
            git_path: PathBuf::from("git"),
            superproject: None,
            retry: RetryPolicy::default(),
            config: Vec::new(),
        }
    }

    /// Use a specific git executable.
    pub fn with_git(mut self, git_path: impl Into<PathBuf>) -> Self {
        self.git_path = git_path.into();
        self
    }

    /// Run submodule operations against this repository.
    pub fn with_superproject(mut self, root: impl Into<PathBuf>) -> Self {
        self.superproject = Some(root.into());
        self
    }

    /// Set the retry policy for network operations.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Pass `-c key=value` to every git command.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.push((key.into(), value.into()));
        self
    }

    /// Check if git can be executed.
    pub fn is_available(&self) -> bool {
        Command::new(&self.git_path)
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    /// Run git with `args`, optionally inside `dir`.
    fn run_git<S: AsRef<OsStr>>(&self, dir: Option<&Path>, args: &[S]) -> Result<Output> {
        let mut cmd = Command::new(&self.git_path);
        for (key, value) in &self.config {
            cmd.arg("-c").arg(format!("{key}={value}"));
        }
        if let Some(dir) = dir {
            cmd.arg("-C").arg(dir);
        }
        cmd.args(args);

        let display = display_command(&self.git_path, dir, args);
        log::debug!("running: {display}");

        cmd.output().map_err(|e| Error::Command {
            command: display,
            exit_code: None,
            output: format!("failed to execute git: {e}"),
        })
    }

    /// Run git and return trimmed stdout, failing on non-zero exit.
    fn run_git_checked<S: AsRef<OsStr>>(&self, dir: Option<&Path>, args: &[S]) -> Result<String> {
        let output = self.run_git(dir, args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let captured = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            return Err(Error::Command {
                command: display_command(&self.git_path, dir, args),
                exit_code: output.status.code(),
                output: captured,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run a read-only git query; a non-zero exit means "no answer".
    fn query<S: AsRef<OsStr>>(&self, dir: &Path, args: &[S]) -> Result<Option<String>> {
        let output = self.run_git(Some(dir), args)?;
        if !output.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!stdout.is_empty()).then_some(stdout))
    }

    /// Superproject root and `dir` relative to it.
    fn submodule_paths<'a>(&'a self, dir: &'a Path) -> Result<(&'a Path, &'a Path)> {
        let root = self.superproject_root()?;
        let relative = dir
            .strip_prefix(root)
            .map_err(|_| Error::NotInSuperproject {
                path: dir.to_path_buf(),
                superproject: root.to_path_buf(),
            })?;
        Ok((root, relative))
    }

    fn superproject_root(&self) -> Result<&Path> {
        self.superproject.as_deref().ok_or(Error::NoSuperproject)
    }
}

impl Default for GitBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Vcs for GitBackend {
    fn clone_repo(&self, url: &str, dir: &Path) -> Result<()> {
        with_retry(&self.retry, "clone", || {
            let args: [&OsStr; 5] = [
                "clone".as_ref(),
                "-q".as_ref(),
                "--".as_ref(),
                url.as_ref(),
                dir.as_os_str(),
            ];
            self.run_git_checked(None, &args)
        })?;
        Ok(())
    }

    fn fetch_updates(&self, dir: &Path) -> Result<()> {
        with_retry(&self.retry, "fetch", || {
            self.run_git_checked(Some(dir), &["fetch", "-q", "--tags", "origin"])
        })?;
        Ok(())
    }

    fn checkout_ref(&self, dir: &Path, git_ref: &str) -> Result<()> {
        self.run_git_checked(Some(dir), &["checkout", "-q", git_ref])?;
        Ok(())
    }

    fn pull_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        with_retry(&self.retry, "pull", || {
            self.run_git_checked(Some(dir), &["pull", "-q", "--no-edit", "origin", branch])
        })?;
        Ok(())
    }

    fn current_origin_url(&self, dir: &Path) -> Result<Option<String>> {
        // Without this check git would report the enclosing repository's origin.
        if !dir.join(".git").exists() {
            return Ok(None);
        }
        self.query(dir, &["config", "--get", "remote.origin.url"])
    }

    fn current_branch(&self, dir: &Path) -> Result<Option<String>> {
        self.query(dir, &["symbolic-ref", "-q", "--short", "HEAD"])
    }

    fn local_branch_exists(&self, dir: &Path, branch: &str) -> Result<bool> {
        let reference = format!("refs/heads/{branch}");
        let output = self.run_git(Some(dir), &["show-ref", "--verify", "--quiet", reference.as_str()])?;
        Ok(output.status.success())
    }

    fn default_branch(&self, dir: &Path) -> Result<String> {
        let remote_head =
            self.query(dir, &["symbolic-ref", "-q", "--short", "refs/remotes/origin/HEAD"])?;
        if let Some(head) = remote_head {
            let branch = head.strip_prefix("origin/").unwrap_or(&head);
            return Ok(branch.to_string());
        }
        Ok("master".to_string())
    }

    fn git_path(&self, dir: &Path, relative: &str) -> Result<PathBuf> {
        let path = self.run_git_checked(Some(dir), &["rev-parse", "--git-path", relative])?;
        let path = PathBuf::from(path);
        Ok(if path.is_absolute() { path } else { dir.join(path) })
    }

    fn add_submodule(&self, url: &str, dir: &Path) -> Result<()> {
        let (root, relative) = self.submodule_paths(dir)?;
        with_retry(&self.retry, "submodule add", || {
            let args: [&OsStr; 6] = [
                "submodule".as_ref(),
                "add".as_ref(),
                "-q".as_ref(),
                "--".as_ref(),
                url.as_ref(),
                relative.as_os_str(),
            ];
            self.run_git_checked(Some(root), &args)
        })?;
        Ok(())
    }

    fn init_submodules(&self) -> Result<()> {
        let root = self.superproject_root()?;
        self.run_git_checked(Some(root), &["submodule", "-q", "init"])?;
        Ok(())
    }

    fn update_submodules(&self) -> Result<()> {
        let root = self.superproject_root()?;
        with_retry(&self.retry, "submodule update", || {
            self.run_git_checked(Some(root), &["submodule", "-q", "update"])
        })?;
        Ok(())
    }

    fn stage_path(&self, dir: &Path) -> Result<()> {
        let (root, relative) = self.submodule_paths(dir)?;
        let args: [&OsStr; 3] = ["add".as_ref(), "--".as_ref(), relative.as_os_str()];
        self.run_git_checked(Some(root), &args)?;
        Ok(())
    }

    fn stage_removed_path(&self, dir: &Path) -> Result<()> {
        let (root, relative) = self.submodule_paths(dir)?;
        let args: [&OsStr; 7] = [
            "rm".as_ref(),
            "-q".as_ref(),
            "-r".as_ref(),
            "--cached".as_ref(),
            "--ignore-unmatch".as_ref(),
            "--".as_ref(),
            relative.as_os_str(),
        ];
        self.run_git_checked(Some(root), &args)?;
        Ok(())
    }

    fn describe_version(&self, dir: &Path) -> Result<Option<String>> {
        self.query(dir, &["describe", "--tags"])
    }

    fn last_commit_date(&self, dir: &Path) -> Result<Option<DateTime<FixedOffset>>> {
        let raw = self.query(dir, &["log", "-1", "--format=%cI"])?;
        Ok(raw.and_then(|s| parse_commit_date(&s)))
    }
}

/// Parse a strict ISO 8601 commit date (`%cI`).
pub fn parse_commit_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()
}

fn display_command<S: AsRef<OsStr>>(git: &Path, dir: Option<&Path>, args: &[S]) -> String {
    let mut parts = vec![git.display().to_string()];
    if let Some(dir) = dir {
        parts.push("-C".to_string());
        parts.push(dir.display().to_string());
    }
    parts.extend(args.iter().map(|a| a.as_ref().to_string_lossy().into_owned()));
    parts.join(" ")
}
