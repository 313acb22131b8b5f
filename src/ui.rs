//! Terminal output for vimbundle.
//!
//! Generic helpers come from termkit; this module adds bundle-specific
//! formatting.

use bundlekit::{Decision, Outcome};
use colored::{ColoredString, Colorize};
use std::path::Path;

pub use termkit::format::plural;
pub use termkit::layout::{header, kv};
pub use termkit::messages::{dim, error, info, success, warn};

/// Colored, fixed-width label for a planned decision.
pub fn decision_label(decision: &Decision) -> ColoredString {
    let label = format!("{:<9}", decision.label());
    match decision {
        Decision::Create => label.green(),
        Decision::RefreshInPlace => label.blue(),
        Decision::ReOrigin { .. } => label.yellow(),
        Decision::LeaveAlone => label.dimmed(),
        Decision::Remove => label.red(),
    }
}

/// One-line description of a finished bundle.
pub fn outcome_line(name: &str, outcome: &Outcome, trash_root: &Path) -> String {
    match outcome {
        Outcome::ReOriginated { archived_to } | Outcome::Removed { archived_to } => format!(
            "{name} {} (old copy in {})",
            outcome.label(),
            display_relative(archived_to, trash_root)
        ),
        _ => format!("{name} {}", outcome.label()),
    }
}

/// `path` relative to `root`'s parent when possible, for shorter output.
fn display_relative(path: &Path, root: &Path) -> String {
    root.parent()
        .and_then(|parent| path.strip_prefix(parent).ok())
        .unwrap_or(path)
        .display()
        .to_string()
}
