//! Core types for bundle reconciliation.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One declared unit of desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Directory name under the bundle root
    pub name: String,
    /// Remote origin; `None` for static directives
    pub url: Option<String>,
    /// Branch, tag or commit. `None` tracks the default branch.
    pub git_ref: Option<String>,
    /// Shell command run inside the bundle after each sync
    pub post_command: Option<String>,
    /// Static directives pin a directory that must be left untouched
    pub is_static: bool,
    /// Source line the directive was declared on (1-indexed)
    pub line: usize,
}

impl Directive {
    /// Create a bundle directive, deriving its name from the URL.
    pub fn bundle(url: impl Into<String>, git_ref: Option<String>, line: usize) -> Self {
        let url = url.into();
        Self {
            name: bundle_name(&url),
            url: Some(url),
            git_ref,
            post_command: None,
            is_static: false,
            line,
        }
    }

    /// Create a static directive for an existing directory.
    pub fn pinned(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            url: None,
            git_ref: None,
            post_command: None,
            is_static: true,
            line,
        }
    }

    /// Attach a post-sync command, chaining onto any existing one.
    pub fn add_post_command(&mut self, command: &str) {
        self.post_command = Some(match self.post_command.take() {
            Some(existing) => format!("{existing} && {command}"),
            None => command.to_string(),
        });
    }
}

/// Derive a bundle directory name from its URL.
///
/// Takes the last `/`-delimited segment and strips a `vim-` prefix and a
/// `.git` suffix, so `https://github.com/tpope/vim-fugitive.git` becomes
/// `fugitive`.
pub fn bundle_name(url: &str) -> String {
    let segment = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    let segment = segment.strip_suffix(".git").unwrap_or(segment);
    let segment = segment.strip_prefix("vim-").unwrap_or(segment);
    segment.to_string()
}

/// Observed state of one entry in the bundle root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleState {
    /// Directory name
    pub name: String,
    /// Origin configured in the working copy, if it is one
    pub origin_url: Option<String>,
}

/// What reconciliation will do to one bundle directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No directory exists yet
    Create,
    /// Directory exists with the declared origin
    RefreshInPlace,
    /// Directory exists but points somewhere else
    ReOrigin {
        /// Origin found on disk, if any
        previous: Option<String>,
    },
    /// Static directive; never touched
    LeaveAlone,
    /// Directory is not declared anymore
    Remove,
}

impl Decision {
    /// Whether carrying out this decision changes anything beyond a refresh.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Create | Self::ReOrigin { .. } | Self::Remove)
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::RefreshInPlace => "refresh",
            Self::ReOrigin { .. } => "re-origin",
            Self::LeaveAlone => "leave",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A decision paired with the bundle it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    /// Bundle directory name
    pub name: String,
    /// What will happen
    pub decision: Decision,
}

/// Terminal state of one bundle after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Freshly cloned
    Created,
    /// Fetched and moved to the declared ref
    Refreshed,
    /// Old checkout archived and replaced
    ReOriginated {
        /// Where the old checkout went
        archived_to: PathBuf,
    },
    /// Static bundle, untouched
    LeftAlone,
    /// Undeclared bundle moved to the trash
    Removed {
        /// Where it went
        archived_to: PathBuf,
    },
}

impl Outcome {
    /// Past-tense label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Refreshed => "refreshed",
            Self::ReOriginated { .. } => "re-originated",
            Self::LeftAlone => "left alone",
            Self::Removed { .. } => "removed",
        }
    }
}

/// Version metadata for one installed bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRecord {
    /// Bundle directory name
    pub name: String,
    /// `git describe` output, if the backend could produce one
    pub version_label: Option<String>,
    /// Date of the last commit
    pub date: Option<DateTime<FixedOffset>>,
}

/// How bundles are attached to the user's environment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Each bundle is an independent clone
    #[default]
    Clone,
    /// Each bundle is a submodule of the dotfiles repository
    Submodule {
        /// Root of the dotfiles repository
        superproject: PathBuf,
    },
}

impl SyncMode {
    /// Whether bundles are tracked as submodules.
    pub fn is_submodule(&self) -> bool {
        matches!(self, Self::Submodule { .. })
    }
}

/// Summary of a completed reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Outcome per bundle, in processing order (removals last)
    pub outcomes: Vec<(String, Outcome)>,
    /// Inventory of synced, non-static bundles in declaration order
    pub inventory: Vec<InventoryRecord>,
}

impl SyncReport {
    /// Count outcomes matching a predicate.
    pub fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    /// Number of bundles whose directory was created, replaced or removed.
    pub fn structural_changes(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                Outcome::Created | Outcome::ReOriginated { .. } | Outcome::Removed { .. }
            )
        })
    }
}
