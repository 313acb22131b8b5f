//! # termkit
//!
//! Terminal UI toolkit for building consistent CLI output.
//!
//! This crate provides reusable building blocks for CLI interfaces:
//! - **Messages**: Consistent info, warning, error, and success output
//! - **Layout**: Headers, key-value pairs, step labels
//! - **Progress**: Spinners and multi-stage tracking
//! - **Formatting**: Pluralization
//!
//! ## Quick Start
//!
//! ```no_run
//! use termkit::{format, layout, messages, progress};
//!
//! // Messages
//! messages::info("Starting operation...");
//! messages::success("Done!");
//!
//! // Layout
//! layout::header("Configuration");
//! layout::kv("Bundles", "/home/me/.vim/bundle");
//!
//! // Progress
//! let spinner = progress::spinner("Loading...");
//! // ... do work ...
//! progress::finish_success(&spinner, "Loaded");
//!
//! // Formatting
//! assert_eq!(format::plural(3, "bundle"), "3 bundles");
//! ```
//!
//! ## Design Philosophy
//!
//! termkit provides opinionated defaults for a consistent look:
//! - Success: green checkmark (✓)
//! - Error: red cross (✗)
//! - Warning: yellow warning sign (⚠)
//! - Info: blue info icon (ℹ)
//! - Headers: cyan and bold

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format;
pub mod layout;
pub mod messages;
pub mod progress;

// Re-export commonly used items at crate root for convenience
pub use format::plural;
pub use layout::{header, kv};
pub use messages::{dim, error, info, success, warn};
pub use progress::{StageProgress, spinner};
