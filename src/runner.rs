use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Run a command silently, returning success/failure
pub fn run_quiet(cmd: &str, args: &[&str], dir: &Path) -> bool {
    log::debug!("Running {} {} in {}", cmd, args.join(" "), dir.display());
    Command::new(cmd)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check if a command exists
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Result of a [`helptags`] run.
#[derive(Debug, PartialEq, Eq)]
pub enum Helptags {
    /// Tags were written in this many directories
    Built(usize),
    /// `vim` is not on `PATH`
    VimMissing,
    /// These directories could not be indexed
    Failed(Vec<PathBuf>),
}

/// Build a `tags` file in each existing directory of `doc_dirs`.
///
/// Vim runs without any vimrc, one directory at a time.
pub fn helptags(doc_dirs: &[PathBuf]) -> Helptags {
    if !command_exists("vim") {
        return Helptags::VimMissing;
    }

    let mut built = 0;
    let mut failed = Vec::new();
    for dir in doc_dirs.iter().filter(|d| d.is_dir()) {
        let command = format!("helptags {}", escape_ex_path(dir));
        let args = ["-u", "NONE", "-i", "NONE", "-N", "-es", "-c", command.as_str(), "-c", "qa!"];
        if run_quiet("vim", &args, dir) {
            built += 1;
        } else {
            failed.push(dir.clone());
        }
    }

    if failed.is_empty() {
        Helptags::Built(built)
    } else {
        Helptags::Failed(failed)
    }
}

/// Backslash-escape characters that are special in an Ex file argument.
fn escape_ex_path(path: &Path) -> String {
    const SPECIAL: &str = " \t\n*?[{`$\\%#'\"|!<";
    let mut escaped = String::new();
    for c in path.display().to_string().chars() {
        if SPECIAL.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_run_quiet_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_quiet("sh", &["-c", "exit 0"], dir.path()));
        assert!(!run_quiet("sh", &["-c", "exit 1"], dir.path()));
        assert!(!run_quiet("definitely-not-a-command-xyz", &[], dir.path()));
    }

    #[test]
    fn test_escape_ex_path() {
        assert_eq!(escape_ex_path(Path::new("/a/it's doc")), r"/a/it\'s\ doc");
        assert_eq!(escape_ex_path(Path::new("/plain/doc")), "/plain/doc");
    }

    #[test]
    fn test_helptags_writes_tags_files() {
        if !command_exists("vim") {
            assert_eq!(helptags(&[]), Helptags::VimMissing);
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let docs = tmp.path().join("doc");
        let bundle_doc = tmp.path().join("bundle/foo/doc");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::create_dir_all(&bundle_doc).unwrap();
        std::fs::write(docs.join("bundles.txt"), "*bundles.txt*  Installed bundles\n").unwrap();
        std::fs::write(bundle_doc.join("foo.txt"), "*foo.txt*  Foo\n\n*foo-intro*\nHello.\n")
            .unwrap();
        let missing = tmp.path().join("bundle/bar/doc");

        let result = helptags(&[docs.clone(), bundle_doc.clone(), missing]);

        assert_eq!(result, Helptags::Built(2));
        assert!(docs.join("tags").is_file());
        let tags = std::fs::read_to_string(bundle_doc.join("tags")).unwrap();
        assert!(tags.contains("foo-intro"));
    }
}
