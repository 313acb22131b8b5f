//! Bundle reconciliation: converge the bundle directory on the directives.
//!
//! Every run re-derives its decisions from what is on disk, so running twice
//! in a row is a refresh and nothing more:
//!
//! | On disk                         | Decision          |
//! |---------------------------------|-------------------|
//! | no directory                    | `Create`          |
//! | directory with the same origin  | `RefreshInPlace`  |
//! | directory with another origin   | `ReOrigin`        |
//! | anything, `static:` directive   | `LeaveAlone`      |
//! | directory nobody declares       | `Remove`          |
//!
//! Nothing is deleted: replaced and undeclared checkouts go to the trash.

use crate::backend::Vcs;
use crate::directive::validate_unique;
use crate::error::{Error, Result};
use crate::hook::{Shell, run_post_command};
use crate::inventory;
use crate::trash::Archiver;
use crate::types::{
    BundleState, Decision, Directive, Outcome, PlannedAction, SyncMode, SyncReport,
};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Pattern kept out of every bundle's status by `info/exclude`.
pub const EXCLUDED_HELPTAGS: &str = "doc/tags";

/// Progress callback for reconciliation.
///
/// Implement this trait to receive progress updates during a run. All
/// methods default to doing nothing.
pub trait SyncObserver {
    /// Called before a bundle is processed
    fn on_bundle_start(&mut self, _name: &str, _decision: &Decision) {}

    /// Called before a bundle's post-sync command runs
    fn on_hook_start(&mut self, _name: &str, _command: &str) {}

    /// Called after a bundle reached its final state
    fn on_bundle_complete(&mut self, _name: &str, _outcome: &Outcome) {}
}

/// Observer that ignores everything.
pub struct NoObserver;

impl SyncObserver for NoObserver {}

/// Drives bundle directories to match a list of directives.
pub struct Reconciler<'a> {
    vcs: &'a dyn Vcs,
    shell: &'a dyn Shell,
    mode: &'a SyncMode,
    bundles_root: PathBuf,
    trash_root: PathBuf,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over `bundles_root`, archiving into `trash_root`.
    pub fn new(
        vcs: &'a dyn Vcs,
        shell: &'a dyn Shell,
        mode: &'a SyncMode,
        bundles_root: impl Into<PathBuf>,
        trash_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            vcs,
            shell,
            mode,
            bundles_root: bundles_root.into(),
            trash_root: trash_root.into(),
        }
    }

    /// Directory a bundle lives in.
    pub fn bundle_dir(&self, name: &str) -> PathBuf {
        self.bundles_root.join(name)
    }

    /// Names of the visible subdirectories of the bundle root.
    ///
    /// A missing root lists as empty.
    pub fn list_bundle_dirs(&self) -> Result<BTreeSet<String>> {
        let entries = match fs::read_dir(&self.bundles_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(Error::io(&self.bundles_root, e)),
        };

        let mut names = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.bundles_root, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            names.insert(name);
        }
        Ok(names)
    }

    /// Observed state of every bundle directory, sorted by name.
    pub fn observe(&self) -> Result<Vec<BundleState>> {
        self.list_bundle_dirs()?
            .into_iter()
            .map(|name| {
                let origin_url = self.vcs.current_origin_url(&self.bundle_dir(&name))?;
                Ok(BundleState { name, origin_url })
            })
            .collect()
    }

    /// Decide what to do with one directive, given whether its directory exists.
    pub fn decide(&self, directive: &Directive, present: bool) -> Result<Decision> {
        let Some(url) = declared_url(directive) else {
            return Ok(Decision::LeaveAlone);
        };
        if !present {
            return Ok(Decision::Create);
        }

        let origin = self
            .vcs
            .current_origin_url(&self.bundle_dir(&directive.name))?;
        if origin.as_deref() == Some(url) {
            Ok(Decision::RefreshInPlace)
        } else {
            Ok(Decision::ReOrigin { previous: origin })
        }
    }

    /// Compute every decision a run would make without changing anything.
    pub fn plan(&self, directives: &[Directive]) -> Result<Vec<PlannedAction>> {
        validate_unique(directives)?;
        let mut remaining = self.list_bundle_dirs()?;
        let mut actions = Vec::with_capacity(directives.len() + remaining.len());

        for directive in directives {
            let present = remaining.remove(&directive.name);
            actions.push(PlannedAction {
                name: directive.name.clone(),
                decision: self.decide(directive, present)?,
            });
        }

        actions.extend(remaining.into_iter().map(|name| PlannedAction {
            name,
            decision: Decision::Remove,
        }));
        Ok(actions)
    }

    /// Bring the bundle root in line with `directives`.
    ///
    /// Directives are processed in order and undeclared directories are
    /// archived last. The first error aborts the run; whatever was already
    /// done stays done and the next run picks up from there.
    pub fn reconcile(
        &self,
        directives: &[Directive],
        observer: &mut dyn SyncObserver,
    ) -> Result<SyncReport> {
        validate_unique(directives)?;

        if self.mode.is_submodule() {
            self.vcs.init_submodules()?;
            self.vcs.update_submodules()?;
        }

        fs::create_dir_all(&self.bundles_root).map_err(|e| Error::io(&self.bundles_root, e))?;
        let mut remaining = self.list_bundle_dirs()?;
        let archiver = Archiver::new(&self.trash_root, self.vcs, self.mode);
        let mut report = SyncReport::default();

        for directive in directives {
            let present = remaining.remove(&directive.name);
            let decision = self.decide(directive, present)?;
            observer.on_bundle_start(&directive.name, &decision);

            let outcome = self.apply(directive, &decision, &archiver, observer)?;
            if !directive.is_static {
                let dir = self.bundle_dir(&directive.name);
                report
                    .inventory
                    .push(inventory::record_for(self.vcs, &directive.name, &dir)?);
            }

            observer.on_bundle_complete(&directive.name, &outcome);
            report.outcomes.push((directive.name.clone(), outcome));
        }

        for name in remaining {
            observer.on_bundle_start(&name, &Decision::Remove);
            let archived_to = archiver.archive(&self.bundle_dir(&name))?;
            let outcome = Outcome::Removed { archived_to };
            observer.on_bundle_complete(&name, &outcome);
            report.outcomes.push((name, outcome));
        }

        Ok(report)
    }

    /// Carry out one directive's decision.
    fn apply(
        &self,
        directive: &Directive,
        decision: &Decision,
        archiver: &Archiver<'_>,
        observer: &mut dyn SyncObserver,
    ) -> Result<Outcome> {
        let Some(url) = declared_url(directive) else {
            return Ok(Outcome::LeftAlone);
        };
        let dir = self.bundle_dir(&directive.name);

        let outcome = match decision {
            Decision::Create => {
                self.materialize(url, &dir)?;
                Outcome::Created
            }
            Decision::ReOrigin { previous } => {
                log::info!(
                    "{}: origin changed from {} to {url}",
                    directive.name,
                    previous.as_deref().unwrap_or("(none)")
                );
                let archived_to = archiver.archive(&dir)?;
                self.materialize(url, &dir)?;
                Outcome::ReOriginated { archived_to }
            }
            Decision::RefreshInPlace => {
                self.vcs.fetch_updates(&dir)?;
                Outcome::Refreshed
            }
            Decision::LeaveAlone => return Ok(Outcome::LeftAlone),
            Decision::Remove => {
                let archived_to = archiver.archive(&dir)?;
                return Ok(Outcome::Removed { archived_to });
            }
        };

        self.resolve_ref(&dir, directive.git_ref.as_deref())?;

        let exclude = self.vcs.git_path(&dir, "info/exclude")?;
        ensure_excluded(&exclude, EXCLUDED_HELPTAGS)?;

        if self.mode.is_submodule() {
            self.vcs.stage_path(&dir)?;
        }

        if let Some(command) = &directive.post_command {
            observer.on_hook_start(&directive.name, command);
            run_post_command(self.shell, &directive.name, &dir, command)?;
        }

        Ok(outcome)
    }

    /// Clone (or add as a submodule) `url` at `dir`.
    fn materialize(&self, url: &str, dir: &Path) -> Result<()> {
        match self.mode {
            SyncMode::Clone => self.vcs.clone_repo(url, dir),
            SyncMode::Submodule { .. } => self.vcs.add_submodule(url, dir),
        }
    }

    /// Move the working copy to the declared ref.
    ///
    /// Tags, commits and not-yet-local branches are checked out. A local
    /// branch (or the default branch when no ref is declared) is pulled; it
    /// is only checked out first if it is not already the current branch.
    fn resolve_ref(&self, dir: &Path, git_ref: Option<&str>) -> Result<()> {
        if let Some(git_ref) = git_ref
            && !self.vcs.local_branch_exists(dir, git_ref)?
        {
            return self.vcs.checkout_ref(dir, git_ref);
        }

        let branch = match git_ref {
            Some(branch) => branch.to_string(),
            None => self.vcs.default_branch(dir)?,
        };
        if self.vcs.current_branch(dir)?.as_deref() != Some(branch.as_str()) {
            self.vcs.checkout_ref(dir, &branch)?;
        }
        self.vcs.pull_branch(dir, &branch)
    }
}

/// URL of a non-static directive.
fn declared_url(directive: &Directive) -> Option<&str> {
    if directive.is_static {
        return None;
    }
    directive.url.as_deref()
}

/// Append `pattern` to an exclude file unless a line already matches it.
///
/// Returns whether the file was changed.
pub fn ensure_excluded(exclude_file: &Path, pattern: &str) -> Result<bool> {
    let existing = match fs::read_to_string(exclude_file) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::io(exclude_file, e)),
    };
    if existing.lines().any(|line| line.trim() == pattern) {
        return Ok(false);
    }

    if let Some(parent) = exclude_file.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(exclude_file)
        .map_err(|e| Error::io(exclude_file, e))?;
    let separator = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    writeln!(file, "{separator}{pattern}").map_err(|e| Error::io(exclude_file, e))?;
    Ok(true)
}
