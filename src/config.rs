//! Settings loading.
//!
//! Settings come from option lines of the form `[-[-]]key[=value]`, read
//! first from the config file and then from the command line:
//!
//! ```text
//! # ~/.vimbundle.conf
//! submodule
//! vimdir_path = $dotfiles_path/vim
//! --no-helptags
//! retries=5
//! ```
//!
//! Values expand `~` and `$NAME` / `${NAME}`. Names are looked up among the
//! options first (`$vimdir_path`), then in the environment.

use crate::paths;
use bundlekit::{RetryPolicy, SyncMode};
use std::env::VarError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment lookup used for `$NAME` expansion.
pub type Env<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// Errors produced while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key is not a known option
    #[error("{origin}: unknown option '{key}'")]
    UnknownOption {
        /// Key as written
        key: String,
        /// Where the option came from
        origin: String,
    },

    /// `$NAME` matched neither an option nor an environment variable
    #[error("{origin}: undefined variable '${name}' in '{key}'")]
    UndefinedVariable {
        /// Variable name without the `$`
        name: String,
        /// Option whose value referenced it
        key: String,
        /// Where the option came from
        origin: String,
    },

    /// Value does not fit the option's type
    #[error("{origin}: invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Option key
        key: String,
        /// Why the value was rejected
        reason: String,
        /// Where the option came from
        origin: String,
    },

    /// Config file could not be read
    #[error("could not read {}: {source}", path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Option Lines
// ============================================================================

/// One parsed `[-[-]]key[=value]` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionLine {
    /// Key with `-` normalized to `_`
    pub key: String,
    /// Raw value, if an `=` was present
    pub value: Option<String>,
}

/// Parse one option line. Blank lines and `#` comments yield `None`.
pub fn parse_option(line: &str) -> Option<OptionLine> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let line = line
        .strip_prefix("--")
        .or_else(|| line.strip_prefix('-'))
        .unwrap_or(line);
    let (key, value) = match line.split_once('=') {
        Some((key, value)) => (key.trim(), Some(value.trim().to_string())),
        None => (line.trim(), None),
    };

    Some(OptionLine {
        key: key.replace('-', "_"),
        value,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Verbose,
    Submodule,
    DotfilesPath,
    VimdirPath,
    VimrcPath,
    BundlesPath,
    TrashPath,
    DocsPath,
    Helptags,
    Retries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Flag,
    Path,
    Count,
}

impl Key {
    const ALL: [Self; 10] = [
        Self::Verbose,
        Self::Submodule,
        Self::DotfilesPath,
        Self::VimdirPath,
        Self::VimrcPath,
        Self::BundlesPath,
        Self::TrashPath,
        Self::DocsPath,
        Self::Helptags,
        Self::Retries,
    ];

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    fn name(self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Submodule => "submodule",
            Self::DotfilesPath => "dotfiles_path",
            Self::VimdirPath => "vimdir_path",
            Self::VimrcPath => "vimrc_path",
            Self::BundlesPath => "bundles_path",
            Self::TrashPath => "trash_path",
            Self::DocsPath => "docs_path",
            Self::Helptags => "helptags",
            Self::Retries => "retries",
        }
    }

    fn kind(self) -> Kind {
        match self {
            Self::Verbose | Self::Submodule | Self::Helptags => Kind::Flag,
            Self::Retries => Kind::Count,
            _ => Kind::Path,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Fully resolved, immutable settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub verbose: bool,
    pub submodule: bool,
    pub dotfiles_path: PathBuf,
    pub vimdir_path: PathBuf,
    pub vimrc_path: PathBuf,
    pub bundles_path: PathBuf,
    pub trash_path: PathBuf,
    pub docs_path: PathBuf,
    pub helptags: bool,
    pub retries: u32,
}

impl Settings {
    /// How bundles attach to the dotfiles repository.
    pub fn sync_mode(&self) -> SyncMode {
        if self.submodule {
            SyncMode::Submodule {
                superproject: self.dotfiles_path.clone(),
            }
        } else {
            SyncMode::Clone
        }
    }

    /// Retry policy for network operations.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_secs(2))
    }
}

/// Options collected so far, before defaults are derived.
#[derive(Debug, Clone)]
pub struct Options {
    verbose: Option<bool>,
    submodule: Option<bool>,
    dotfiles_path: PathBuf,
    vimdir_path: Option<PathBuf>,
    vimrc_path: Option<PathBuf>,
    bundles_path: Option<PathBuf>,
    trash_path: Option<PathBuf>,
    docs_path: Option<PathBuf>,
    helptags: Option<bool>,
    retries: Option<u32>,
}

impl Options {
    /// Start from built-in defaults rooted at `dotfiles_path`.
    pub fn new(dotfiles_path: impl Into<PathBuf>) -> Self {
        Self {
            verbose: None,
            submodule: None,
            dotfiles_path: dotfiles_path.into(),
            vimdir_path: None,
            vimrc_path: None,
            bundles_path: None,
            trash_path: None,
            docs_path: None,
            helptags: None,
            retries: None,
        }
    }

    fn vimdir(&self) -> PathBuf {
        self.vimdir_path
            .clone()
            .unwrap_or_else(|| self.dotfiles_path.join(".vim"))
    }

    fn vimrc(&self) -> PathBuf {
        if let Some(path) = &self.vimrc_path {
            return path.clone();
        }
        let dotted = self.dotfiles_path.join(".vimrc");
        let inside = self.vimdir().join("vimrc");
        if !dotted.exists() && inside.exists() {
            inside
        } else {
            dotted
        }
    }

    /// Current value of an option as a string, derived defaults included.
    fn lookup(&self, key: Key) -> String {
        let path = |p: PathBuf| p.to_string_lossy().into_owned();
        match key {
            Key::Verbose => self.verbose.unwrap_or(false).to_string(),
            Key::Submodule => self.submodule.unwrap_or(false).to_string(),
            Key::Helptags => self.helptags.unwrap_or(true).to_string(),
            Key::Retries => self.retries.unwrap_or(3).to_string(),
            Key::DotfilesPath => path(self.dotfiles_path.clone()),
            Key::VimdirPath => path(self.vimdir()),
            Key::VimrcPath => path(self.vimrc()),
            Key::BundlesPath => path(
                self.bundles_path
                    .clone()
                    .unwrap_or_else(|| self.vimdir().join("bundle")),
            ),
            Key::TrashPath => path(
                self.trash_path
                    .clone()
                    .unwrap_or_else(|| self.vimdir().join("Trashed-Bundles")),
            ),
            Key::DocsPath => path(
                self.docs_path
                    .clone()
                    .unwrap_or_else(|| self.vimdir().join("doc")),
            ),
        }
    }

    fn interpolate(
        &self,
        key: Key,
        value: &str,
        origin: &str,
        env: &Env<'_>,
    ) -> Result<String, ConfigError> {
        shellexpand::full_with_context(value, paths::home_string, |name: &str| {
            match Key::parse(name) {
                Some(option) => Ok(Some(self.lookup(option))),
                None => env(name).map(Some).ok_or(VarError::NotPresent),
            }
        })
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::UndefinedVariable {
            name: e.var_name,
            key: key.name().to_string(),
            origin: origin.to_string(),
        })
    }

    /// Apply one option line. `origin` names its source in errors.
    pub fn apply(
        &mut self,
        option: &OptionLine,
        origin: &str,
        env: &Env<'_>,
    ) -> Result<(), ConfigError> {
        let invalid = |key: Key, reason: &str| ConfigError::InvalidValue {
            key: key.name().to_string(),
            reason: reason.to_string(),
            origin: origin.to_string(),
        };

        let (key, negated) = match Key::parse(&option.key) {
            Some(key) => (key, false),
            None => match option.key.strip_prefix("no_").and_then(Key::parse) {
                Some(key) if key.kind() == Kind::Flag => (key, true),
                _ => {
                    return Err(ConfigError::UnknownOption {
                        key: option.key.clone(),
                        origin: origin.to_string(),
                    });
                }
            },
        };

        let value = option
            .value
            .as_deref()
            .map(|v| self.interpolate(key, v, origin, env))
            .transpose()?;

        match key.kind() {
            Kind::Flag => {
                let flag = match (value.as_deref(), negated) {
                    (None, negated) => !negated,
                    (Some(_), true) => return Err(invalid(key, "negated options take no value")),
                    (Some(v), false) => {
                        parse_flag(v).ok_or_else(|| invalid(key, "expected true or false"))?
                    }
                };
                match key {
                    Key::Verbose => self.verbose = Some(flag),
                    Key::Submodule => self.submodule = Some(flag),
                    _ => self.helptags = Some(flag),
                }
            }
            Kind::Count => {
                let count = value
                    .as_deref()
                    .and_then(|v| v.parse::<u32>().ok())
                    .filter(|n| *n >= 1)
                    .ok_or_else(|| invalid(key, "expected a whole number of at least 1"))?;
                self.retries = Some(count);
            }
            Kind::Path => {
                let path = value
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
                    .ok_or_else(|| invalid(key, "expected a path"))?;
                match key {
                    Key::DotfilesPath => self.dotfiles_path = path,
                    Key::VimdirPath => self.vimdir_path = Some(path),
                    Key::VimrcPath => self.vimrc_path = Some(path),
                    Key::BundlesPath => self.bundles_path = Some(path),
                    Key::TrashPath => self.trash_path = Some(path),
                    _ => self.docs_path = Some(path),
                }
            }
        }
        log::trace!("{origin}: {key} = {}", self.lookup(key));
        Ok(())
    }

    /// Apply every option line in `text`.
    pub fn apply_text(&mut self, text: &str, origin: &str, env: &Env<'_>) -> Result<(), ConfigError> {
        for (index, line) in text.lines().enumerate() {
            if let Some(option) = parse_option(line) {
                self.apply(&option, &format!("{origin}:{}", index + 1), env)?;
            }
        }
        Ok(())
    }

    /// Apply a config file. Returns `false` if it does not exist.
    pub fn apply_file(&mut self, path: &Path, env: &Env<'_>) -> Result<bool, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        log::debug!("Loading config from {}", path.display());
        self.apply_text(&text, &path.display().to_string(), env)?;
        Ok(true)
    }

    /// Derive remaining defaults.
    pub fn resolve(self) -> Settings {
        let vimdir_path = self.vimdir();
        let vimrc_path = self.vimrc();
        Settings {
            verbose: self.verbose.unwrap_or(false),
            submodule: self.submodule.unwrap_or(false),
            bundles_path: self
                .bundles_path
                .unwrap_or_else(|| vimdir_path.join("bundle")),
            trash_path: self
                .trash_path
                .unwrap_or_else(|| vimdir_path.join("Trashed-Bundles")),
            docs_path: self.docs_path.unwrap_or_else(|| vimdir_path.join("doc")),
            helptags: self.helptags.unwrap_or(true),
            retries: self.retries.unwrap_or(3),
            dotfiles_path: self.dotfiles_path,
            vimdir_path,
            vimrc_path,
        }
    }
}

/// Command-line origin label for errors.
const CLI_ORIGIN: &str = "command line";

/// Load settings: built-in defaults, then the config file, then `overrides`.
///
/// An explicit `config_file` must exist; the default one is optional.
pub fn load(
    default_dotfiles: PathBuf,
    config_file: Option<&Path>,
    overrides: &[String],
    env: &Env<'_>,
) -> Result<Settings, ConfigError> {
    let cli_options: Vec<OptionLine> = overrides.iter().filter_map(|o| parse_option(o)).collect();

    // The default config file lives in the dotfiles dir, which the command
    // line may move.
    let mut scratch = Options::new(default_dotfiles.clone());
    for option in cli_options.iter().filter(|o| o.key == "dotfiles_path") {
        scratch.apply(option, CLI_ORIGIN, env)?;
    }

    let mut options = Options::new(default_dotfiles);
    match config_file {
        Some(path) => {
            if !options.apply_file(path, env)? {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                });
            }
        }
        None => {
            let path = paths::default_config_file(&scratch.dotfiles_path);
            if !options.apply_file(&path, env)? {
                log::debug!("No config file at {}", path.display());
            }
        }
    }

    for option in &cli_options {
        options.apply(option, CLI_ORIGIN, env)?;
    }
    Ok(options.resolve())
}

// ============================================================================
// Tests
// ============================================================================
