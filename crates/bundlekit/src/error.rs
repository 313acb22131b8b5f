//! Error types for bundle reconciliation.
//!
//! Directive problems are reported as [`ParseError`] before anything on disk
//! is touched. Everything that can go wrong while a run is mutating the bundle
//! tree is an [`Error`]; the caller is expected to abort on any of them.

use std::path::PathBuf;
use thiserror::Error;

/// Errors in the directive source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A `bundle-command:` line appeared before any `bundle:` line
    #[error("line {line}: bundle-command `{command}` has no preceding bundle directive")]
    OrderError {
        /// Line number of the orphaned command (1-indexed)
        line: usize,
        /// The command text
        command: String,
    },

    /// A directive without its required argument
    #[error("line {line}: `{directive}:` requires an argument")]
    MissingArgument {
        /// Line number of the directive (1-indexed)
        line: usize,
        /// Directive keyword, lowercased
        directive: &'static str,
    },

    /// A directive resolves to a name that cannot be a bundle directory
    #[error("line {line}: `{directive}:` resolves to unusable bundle name `{name}`")]
    InvalidName {
        /// Line number of the directive (1-indexed)
        line: usize,
        /// Directive keyword, lowercased
        directive: &'static str,
        /// The rejected name
        name: String,
    },

    /// Two directives resolve to the same bundle directory
    #[error("line {line}: bundle `{name}` is already declared on line {first_line}")]
    DuplicateName {
        /// Directory name both directives resolve to
        name: String,
        /// Line of the first declaration
        first_line: usize,
        /// Line of the conflicting declaration
        line: usize,
    },
}

/// Errors that can occur while reconciling bundles.
#[derive(Debug, Error)]
pub enum Error {
    /// Directive source is malformed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A version-control command exited unsuccessfully
    #[error("`{command}` failed{}: {output}", exit_suffix(*.exit_code))]
    Command {
        /// The command line that was run
        command: String,
        /// Exit code, if the process was not killed by a signal
        exit_code: Option<i32>,
        /// Captured stderr (or stdout when stderr was empty)
        output: String,
    },

    /// Every archive slot for this bundle is already taken
    #[error("trash is full for `{name}`: {trash_root} already holds {name}-01 through {name}-{max}")]
    TrashExhausted {
        /// Bundle name being archived
        name: String,
        /// Trash root that was probed
        trash_root: PathBuf,
        /// Highest slot number probed
        max: usize,
    },

    /// A bundle's post-sync command exited non-zero
    #[error("bundle-command for `{bundle}` failed{}: {command}", exit_suffix(*.exit_code))]
    PostCommand {
        /// Bundle whose hook failed
        bundle: String,
        /// The shell command
        command: String,
        /// Exit code, if any
        exit_code: Option<i32>,
    },

    /// Submodule mode requires bundles to live inside the superproject
    #[error("{path} is not inside the dotfiles repository {superproject}")]
    NotInSuperproject {
        /// Bundle path
        path: PathBuf,
        /// Superproject root
        superproject: PathBuf,
    },

    /// A submodule operation was requested without a dotfiles repository
    #[error("submodule mode requires a dotfiles repository")]
    NoSuperproject,

    /// IO error
    #[error("IO error on {path}: {source}")]
    Io {
        /// Path being operated on
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

fn exit_suffix(code: Option<i32>) -> String {
    code.map(|c| format!(" (exit {c})")).unwrap_or_default()
}

impl Error {
    /// Wrap an IO error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error looks like a transient network failure worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Command { output, .. } => is_network_output(output),
            _ => false,
        }
    }
}

/// Check captured command output for signs of a network failure.
pub fn is_network_output(output: &str) -> bool {
    const NETWORK_PATTERNS: &[&str] = &[
        "could not resolve",
        "connection refused",
        "connection timed out",
        "connection reset",
        "operation timed out",
        "unable to access",
        "temporary failure",
        "network is unreachable",
        "early eof",
        "the remote end hung up unexpectedly",
        "ssl",
    ];

    let lower = output.to_lowercase();
    NETWORK_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Result type alias for bundle operations.
pub type Result<T> = std::result::Result<T, Error>;
