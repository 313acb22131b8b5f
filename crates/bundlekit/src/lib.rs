//! # bundlekit
//!
//! Pure Rust library for keeping a directory of vim plugin checkouts in
//! sync with the bundle directives declared in a vimrc.
//!
//! This crate provides functionality for:
//! - Parsing `Bundle:`, `Bundle-Command:` and `Static:` directives
//! - Cloning, refreshing and re-pointing bundle checkouts
//! - Archiving undeclared bundles into numbered trash slots
//! - Tracking bundles as submodules of a dotfiles repository
//! - Rendering an inventory of installed bundles as a vim help file
//!
//! ## Example
//!
//! ```no_run
//! use bundlekit::backend::git::GitBackend;
//! use bundlekit::hook::SystemShell;
//! use bundlekit::reconcile::{NoObserver, Reconciler};
//! use bundlekit::{SyncMode, directive, inventory};
//! use std::path::Path;
//!
//! let directives = directive::parse_file(Path::new("/home/me/.vimrc")).expect("Failed to parse");
//!
//! let git = GitBackend::new();
//! let mode = SyncMode::Clone;
//! let reconciler = Reconciler::new(
//!     &git,
//!     &SystemShell,
//!     &mode,
//!     "/home/me/.vim/bundle",
//!     "/home/me/.vim/Trashed-Bundles",
//! );
//!
//! let report = reconciler.reconcile(&directives, &mut NoObserver).expect("Sync failed");
//! let doc = inventory::render(&report.inventory, &chrono::Local::now());
//! inventory::write_doc(Path::new("/home/me/.vim/doc"), &doc).expect("Failed to write doc");
//! ```
//!
//! ## Retry Logic
//!
//! Clones, fetches and pulls that fail with network errors are retried with
//! exponential backoff. Configure it with [`RetryPolicy`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod directive;
pub mod error;
pub mod hook;
pub mod inventory;
pub mod manifest;
pub mod reconcile;
pub mod retry;
pub mod trash;
pub mod types;

pub use error::{Error, ParseError, Result};
pub use retry::RetryPolicy;
pub use types::{
    BundleState, Decision, Directive, InventoryRecord, Outcome, PlannedAction, SyncMode,
    SyncReport,
};
