mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod runner;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, SyncArgs};
use std::io;
use std::process::ExitCode;

/// Exit code when a bundle's post-sync command fails
pub const POST_COMMAND_FAILED: u8 = 47;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error(&format!("{err:#}"));
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(Command::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "vimbundle", &mut io::stdout());
        return Ok(());
    }

    let settings = config::load(
        paths::dotfiles_dir()?,
        cli.config.as_deref(),
        &cli.option_lines(),
        &|name: &str| std::env::var(name).ok(),
    )?;

    // Initialize logging based on verbosity
    let verbose = cli.verbose.max(u8::from(settings.verbose));
    let log_level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    log::debug!("{settings:#?}");

    let ctx = Context {
        verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        None => commands::sync::run(&ctx, &settings, SyncArgs::default()),
        Some(Command::Sync(args)) => commands::sync::run(&ctx, &settings, args),
        Some(Command::Plan) => commands::plan::run(&ctx, &settings),
        Some(Command::List(args)) => commands::list::run(&ctx, &settings, args),
        Some(Command::Completions { .. }) => Ok(()),
    }
}

/// Map a failed run onto the process exit code.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<bundlekit::Error>() {
        Some(bundlekit::Error::PostCommand { .. }) => POST_COMMAND_FAILED,
        _ => 1,
    }
}
