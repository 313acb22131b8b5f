//! Running `bundle-command:` hooks.

use crate::error::{Error, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Runs a shell command inside a bundle directory.
pub trait Shell: Send + Sync {
    /// Run `command` with `dir` as the working directory.
    ///
    /// Returns the exit code, or `None` if the process was killed by a signal.
    fn run(&self, dir: &Path, command: &str) -> Result<Option<i32>>;
}

/// Runs hooks through `sh -c`, streaming their output to the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn run(&self, dir: &Path, command: &str) -> Result<Option<i32>> {
        log::info!("running `{command}` in {}", dir.display());
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| Error::io(dir, e))?;
        Ok(status.code())
    }
}

/// Run a bundle's post-sync command, turning a failed exit into an error.
pub fn run_post_command(shell: &dyn Shell, bundle: &str, dir: &Path, command: &str) -> Result<()> {
    match shell.run(dir, command)? {
        Some(0) => Ok(()),
        exit_code => Err(Error::PostCommand {
            bundle: bundle.to_string(),
            command: command.to_string(),
            exit_code,
        }),
    }
}
