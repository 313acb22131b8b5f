//! In-memory remotes with on-disk working copies, for tests.
//!
//! Working-copy state lives in files under `<dir>/.git/` so it survives the
//! directory being moved to the trash, just like a real checkout.

use crate::backend::Vcs;
use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct FakeRemote {
    pub default_branch: String,
    pub branches: Vec<String>,
    pub describe: Option<String>,
    pub date: Option<String>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            default_branch: "master".to_string(),
            branches: vec!["master".to_string()],
            describe: None,
            date: Some("2024-01-02T03:04:05+00:00".to_string()),
        }
    }

    pub fn described(mut self, label: &str) -> Self {
        self.describe = Some(label.to_string());
        self
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branches.push(branch.to_string());
        self
    }
}

#[derive(Default)]
pub struct FakeVcs {
    remotes: HashMap<String, FakeRemote>,
    calls: Mutex<Vec<String>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote(mut self, url: &str, remote: FakeRemote) -> Self {
        self.remotes.insert(url.to_string(), remote);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Create a working copy on disk as if it had been cloned earlier.
    pub fn seed_checkout(dir: &Path, url: &str, branch: &str) {
        let git = dir.join(".git");
        fs::create_dir_all(git.join("info")).unwrap();
        fs::write(git.join("origin"), url).unwrap();
        fs::write(git.join("branch"), branch).unwrap();
        fs::write(git.join("branches"), format!("{branch}\n")).unwrap();
    }

    pub fn checked_out(dir: &Path) -> String {
        fs::read_to_string(dir.join(".git").join("ref")).unwrap_or_default()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn name(dir: &Path) -> String {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn remote_for(&self, dir: &Path) -> Option<&FakeRemote> {
        let origin = fs::read_to_string(dir.join(".git").join("origin")).ok()?;
        self.remotes.get(origin.trim())
    }

    fn fail(command: String) -> Error {
        Error::Command {
            command,
            exit_code: Some(128),
            output: "fatal: repository not found".to_string(),
        }
    }

    fn local_branches(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join(".git").join("branches"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Vcs for FakeVcs {
    fn clone_repo(&self, url: &str, dir: &Path) -> Result<()> {
        let call = format!("clone {url} {}", Self::name(dir));
        self.record(call.clone());
        let remote = self.remotes.get(url).ok_or_else(|| Self::fail(call))?;
        fs::create_dir(dir).map_err(|e| Error::io(dir, e))?;
        Self::seed_checkout(dir, url, &remote.default_branch);
        fs::write(dir.join("plugin.vim"), url).map_err(|e| Error::io(dir, e))?;
        Ok(())
    }

    fn fetch_updates(&self, dir: &Path) -> Result<()> {
        self.record(format!("fetch {}", Self::name(dir)));
        Ok(())
    }

    fn checkout_ref(&self, dir: &Path, git_ref: &str) -> Result<()> {
        self.record(format!("checkout {} {git_ref}", Self::name(dir)));
        let git = dir.join(".git");
        let is_branch = self
            .remote_for(dir)
            .is_some_and(|r| r.branches.iter().any(|b| b == git_ref));
        let mut branches = Self::local_branches(dir);
        if is_branch {
            if !branches.iter().any(|b| b == git_ref) {
                branches.push(git_ref.to_string());
            }
            fs::write(git.join("branch"), git_ref).map_err(|e| Error::io(&git, e))?;
        } else {
            fs::write(git.join("branch"), "").map_err(|e| Error::io(&git, e))?;
        }
        fs::write(git.join("branches"), branches.join("\n")).map_err(|e| Error::io(&git, e))?;
        fs::write(git.join("ref"), git_ref).map_err(|e| Error::io(&git, e))?;
        Ok(())
    }

    fn pull_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        self.record(format!("pull {} {branch}", Self::name(dir)));
        let git = dir.join(".git");
        fs::write(git.join("ref"), branch).map_err(|e| Error::io(&git, e))?;
        Ok(())
    }

    fn current_origin_url(&self, dir: &Path) -> Result<Option<String>> {
        Ok(fs::read_to_string(dir.join(".git").join("origin"))
            .ok()
            .map(|s| s.trim().to_string()))
    }

    fn current_branch(&self, dir: &Path) -> Result<Option<String>> {
        let branch = fs::read_to_string(dir.join(".git").join("branch")).unwrap_or_default();
        Ok((!branch.is_empty()).then_some(branch))
    }

    fn local_branch_exists(&self, dir: &Path, branch: &str) -> Result<bool> {
        Ok(Self::local_branches(dir).iter().any(|b| b == branch))
    }

    fn default_branch(&self, dir: &Path) -> Result<String> {
        Ok(self
            .remote_for(dir)
            .map_or_else(|| "master".to_string(), |r| r.default_branch.clone()))
    }

    fn git_path(&self, dir: &Path, relative: &str) -> Result<PathBuf> {
        Ok(dir.join(".git").join(relative))
    }

    fn add_submodule(&self, url: &str, dir: &Path) -> Result<()> {
        self.record(format!("submodule-add {url} {}", Self::name(dir)));
        let remote = self
            .remotes
            .get(url)
            .ok_or_else(|| Self::fail(format!("submodule add {url}")))?;
        fs::create_dir(dir).map_err(|e| Error::io(dir, e))?;
        Self::seed_checkout(dir, url, &remote.default_branch);
        Ok(())
    }

    fn init_submodules(&self) -> Result<()> {
        self.record("submodule-init".to_string());
        Ok(())
    }

    fn update_submodules(&self) -> Result<()> {
        self.record("submodule-update".to_string());
        Ok(())
    }

    fn stage_path(&self, dir: &Path) -> Result<()> {
        self.record(format!("add {}", Self::name(dir)));
        Ok(())
    }

    fn stage_removed_path(&self, dir: &Path) -> Result<()> {
        self.record(format!("rm-cached {}", Self::name(dir)));
        Ok(())
    }

    fn describe_version(&self, dir: &Path) -> Result<Option<String>> {
        let remote = self.remote_for(dir);
        let tag = Self::checked_out(dir);
        Ok(remote.and_then(|r| {
            if r.branches.contains(&tag) || tag.is_empty() {
                r.describe.clone()
            } else {
                Some(tag)
            }
        }))
    }

    fn last_commit_date(&self, dir: &Path) -> Result<Option<DateTime<FixedOffset>>> {
        Ok(self
            .remote_for(dir)
            .and_then(|r| r.date.as_deref())
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok()))
    }
}
