//! Progress indicators for vimbundle CLI.
//!
//! This module re-exports termkit progress functions.

pub use termkit::progress::StageProgress;
