//! Spinners and multi-stage progress.
//!
//! Spinners draw to stderr and disappear when stderr is not a terminal, so
//! piped output stays clean.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(80);

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Start a spinner with a message.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(TICK);
    pb
}

/// A spinner that never draws anything.
pub fn hidden() -> ProgressBar {
    ProgressBar::hidden()
}

/// Stop a spinner, leaving a success line.
pub fn finish_success(pb: &ProgressBar, msg: &str) {
    finish_with(pb, &format!("{} {}", "✓".green(), msg));
}

/// Stop a spinner, leaving an error line.
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    finish_with(pb, &format!("{} {}", "✗".red(), msg));
}

fn finish_with(pb: &ProgressBar, line: &str) {
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.finish_with_message(line.to_string());
}

/// Tracks progress through a known number of stages.
///
/// Each stage gets its own spinner prefixed with `[n/total]`.
pub struct StageProgress {
    total: usize,
    current: usize,
    visible: bool,
    active: Option<ProgressBar>,
}

impl StageProgress {
    /// Create a tracker for `total` stages.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            current: 0,
            visible: true,
            active: None,
        }
    }

    /// Create a tracker that counts but draws nothing.
    pub fn hidden(total: usize) -> Self {
        Self {
            total,
            current: 0,
            visible: false,
            active: None,
        }
    }

    /// Whether a stage is running.
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Begin the next stage. Any unfinished stage is cleared.
    pub fn start(&mut self, msg: &str) {
        if let Some(pb) = self.active.take() {
            pb.finish_and_clear();
        }
        self.current += 1;
        let label = crate::layout::step_label(self.current, self.total.max(self.current));
        let line = format!("{} {msg}", label.blue().bold());
        self.active = Some(if self.visible {
            spinner(&line)
        } else {
            hidden()
        });
    }

    /// Finish the running stage successfully.
    pub fn succeed(&mut self, msg: &str) {
        if let Some(pb) = self.active.take() {
            finish_success(&pb, msg);
        }
    }

    /// Finish the running stage with an error.
    pub fn fail(&mut self, msg: &str) {
        if let Some(pb) = self.active.take() {
            finish_error(&pb, msg);
        }
    }
}

impl Drop for StageProgress {
    fn drop(&mut self) {
        if let Some(pb) = self.active.take() {
            pb.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_stages_count() {
        let mut stages = StageProgress::hidden(2);
        stages.start("one");
        stages.succeed("one done");
        assert!(!stages.is_running());
        stages.start("two");
        assert!(stages.is_running());
        stages.fail("two failed");
        assert!(!stages.is_running());
        assert_eq!(stages.current, 2);
    }

    #[test]
    fn test_starting_a_stage_clears_the_previous_one() {
        let mut stages = StageProgress::hidden(1);
        stages.start("one");
        stages.start("extra");
        assert!(stages.is_running());
        assert_eq!(stages.current, 2);
    }
}
