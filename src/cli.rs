use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vimbundle")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Keep vim bundles in sync with the Bundle: lines in your vimrc", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: <dotfiles>/.vimbundle.conf)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Track bundles as submodules of the dotfiles repository
    #[arg(long, global = true)]
    pub submodule: bool,

    /// Dotfiles directory (default: $VIMBUNDLE_DOTFILES or ~)
    #[arg(long, global = true, value_name = "DIR")]
    pub dotfiles_path: Option<String>,

    /// Vim runtime directory (default: <dotfiles>/.vim)
    #[arg(long, global = true, value_name = "DIR")]
    pub vimdir_path: Option<String>,

    /// File to read directives from (default: <dotfiles>/.vimrc)
    #[arg(long, global = true, value_name = "FILE")]
    pub vimrc_path: Option<String>,

    /// Directory bundles are cloned into (default: <vimdir>/bundle)
    #[arg(long, global = true, value_name = "DIR")]
    pub bundles_path: Option<String>,

    /// Set any option, as in the config file (repeatable)
    #[arg(long = "set", global = true, value_name = "KEY[=VALUE]")]
    pub set: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Command-line options as config option lines, in precedence order.
    pub fn option_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.submodule {
            lines.push("submodule".to_string());
        }
        let paths = [
            ("dotfiles_path", &self.dotfiles_path),
            ("vimdir_path", &self.vimdir_path),
            ("vimrc_path", &self.vimrc_path),
            ("bundles_path", &self.bundles_path),
        ];
        for (key, value) in paths {
            if let Some(value) = value {
                lines.push(format!("{key}={value}"));
            }
        }
        lines.extend(self.set.iter().cloned());
        lines
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Clone, update and archive bundles to match the vimrc (default)
    Sync(SyncArgs),

    /// Show what sync would do without changing anything
    Plan,

    /// List installed bundles with their versions
    List(ListArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Default)]
pub struct SyncArgs {
    /// Only show what would change
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["vimbundle"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.option_lines().is_empty());
    }

    #[test]
    fn test_option_lines_order() {
        let cli = Cli::try_parse_from([
            "vimbundle",
            "--set",
            "retries=9",
            "--submodule",
            "--vimdir-path",
            "~/vim",
            "sync",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(
            cli.option_lines(),
            ["submodule", "vimdir_path=~/vim", "retries=9"]
        );
        assert!(matches!(cli.command, Some(Command::Sync(SyncArgs { dry_run: true }))));
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
