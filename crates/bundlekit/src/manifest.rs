//! Best-effort removal of submodule registrations from git config files.
//!
//! Both `.gitmodules` and `.git/config` describe a submodule with a section
//! header followed by indented keys:
//! ```text
//! [submodule "vim/bundle/fugitive"]
//! 	path = vim/bundle/fugitive
//! 	url = https://github.com/tpope/vim-fugitive.git
//! ```
//! This is plain text surgery. Callers treat any failure here as a warning.

use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;

/// Remove the `[submodule "<name>"]` block from config text.
///
/// Returns `None` if no such block exists.
pub fn strip_submodule_block(text: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r#"(?m)^[ \t]*\[submodule\s+"{}"\][ \t]*\r?\n(?:[ \t]+[^\n]*(?:\n|$)|[ \t]*\r?\n)*"#,
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    if !re.is_match(text) {
        return None;
    }
    Some(re.replace_all(text, "").into_owned())
}

/// Strip a submodule block from the file at `path`, rewriting it in place.
///
/// Returns `Ok(false)` if the file does not exist or has no matching block.
pub fn scrub_file(path: &Path, name: &str) -> io::Result<bool> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    match strip_submodule_block(&text, name) {
        Some(stripped) => {
            fs::write(path, stripped)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Remove `worktree = ...` lines from a repository config file.
///
/// A submodule's git directory points back at its checkout this way; once the
/// directory becomes the checkout's own `.git`, the setting is wrong.
pub fn unset_worktree(path: &Path) -> io::Result<bool> {
    let text = fs::read_to_string(path)?;
    let re = Regex::new(r"(?m)^[ \t]*worktree[ \t]*=[^\n]*(?:\n|$)")
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    if !re.is_match(&text) {
        return Ok(false);
    }
    fs::write(path, re.replace_all(&text, "").into_owned())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GITMODULES: &str = "[submodule \".vim/bundle/fugitive\"]\n\tpath = .vim/bundle/fugitive\n\turl = https://github.com/tpope/vim-fugitive.git\n[submodule \".vim/bundle/surround\"]\n\tpath = .vim/bundle/surround\n\turl = https://github.com/tpope/vim-surround.git\n";

    #[test]
    fn test_strip_first_block() {
        let out = strip_submodule_block(GITMODULES, ".vim/bundle/fugitive").unwrap();
        assert!(!out.contains("fugitive"));
        assert!(out.starts_with("[submodule \".vim/bundle/surround\"]"));
    }

    #[test]
    fn test_strip_last_block_without_trailing_newline() {
        let text = GITMODULES.trim_end();
        let out = strip_submodule_block(text, ".vim/bundle/surround").unwrap();
        assert!(out.contains("fugitive"));
        assert!(!out.contains("surround"));
    }

    #[test]
    fn test_strip_keeps_other_sections() {
        let config = "[core]\n\tbare = false\n[submodule \"b/foo\"]\n\turl = x\n[remote \"origin\"]\n\turl = y\n";
        let out = strip_submodule_block(config, "b/foo").unwrap();
        assert_eq!(out, "[core]\n\tbare = false\n[remote \"origin\"]\n\turl = y\n");
    }

    #[test]
    fn test_name_is_matched_literally() {
        let config = "[submodule \"b/fooXbar\"]\n\turl = x\n";
        assert!(strip_submodule_block(config, "b/foo.bar").is_none());
    }

    #[test]
    fn test_scrub_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!scrub_file(&dir.path().join(".gitmodules"), "x").unwrap());
    }

    #[test]
    fn test_scrub_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".gitmodules");
        fs::write(&path, GITMODULES).unwrap();
        assert!(scrub_file(&path, ".vim/bundle/fugitive").unwrap());
        let after = fs::read_to_string(&path).unwrap();
        assert!(!after.contains("vim-fugitive"));
        assert!(!scrub_file(&path, ".vim/bundle/fugitive").unwrap());
    }

    #[test]
    fn test_unset_worktree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(
            &path,
            "[core]\n\tbare = false\n\tworktree = ../../../../.vim/bundle/foo\n[remote \"origin\"]\n\turl = y\n",
        )
        .unwrap();
        assert!(unset_worktree(&path).unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[core]\n\tbare = false\n[remote \"origin\"]\n\turl = y\n"
        );
        assert!(!unset_worktree(&path).unwrap());
    }
}
