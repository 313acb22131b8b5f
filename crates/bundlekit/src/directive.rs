//! Parser for bundle directives embedded in a vimrc.
//!
//! Directives live in comments so the host file stays valid vimscript:
//! ```text
//! " Bundle: https://github.com/tpope/vim-fugitive.git
//! " Bundle: https://github.com/junegunn/fzf v0.44.1
//! " Bundle-Command: ./install --bin
//! " Static: my-local-plugin
//! ```
//!
//! Matching is case-insensitive and tolerates leading whitespace and the `"`
//! comment marker. Anything else in the file is ignored.

use crate::error::{Error, ParseError, Result};
use crate::types::{Directive, bundle_name};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*"?\s*(bundle-command|bundle|static)\s*:\s*(.*?)\s*$"#)
        .expect("directive regex is valid")
});

/// A directive line as it appears in the source, before folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveLine {
    /// `bundle: <url> [ref]`
    Bundle {
        /// Remote URL
        url: String,
        /// Optional ref
        git_ref: Option<String>,
    },
    /// `bundle-command: <cmd>`
    Command(String),
    /// `static: <name>`
    Static(String),
}

/// Lazily scans lines for directives, yielding `(line_number, directive)`.
///
/// Single pass: the underlying line source is consumed as the scanner runs.
pub struct DirectiveScanner<I> {
    lines: I,
    line_no: usize,
}

impl<I, S> DirectiveScanner<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    /// Wrap a line source.
    pub fn new(lines: I) -> Self {
        Self { lines, line_no: 0 }
    }
}

impl<I, S> Iterator for DirectiveScanner<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = std::result::Result<(usize, DirectiveLine), ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            if let Some(parsed) = parse_line(line.as_ref(), self.line_no) {
                return Some(parsed.map(|d| (self.line_no, d)));
            }
        }
        None
    }
}

/// Parse a single line. Returns `None` for lines that are not directives.
fn parse_line(
    line: &str,
    line_no: usize,
) -> Option<std::result::Result<DirectiveLine, ParseError>> {
    let caps = DIRECTIVE_RE.captures(line)?;
    let keyword = caps[1].to_lowercase();
    let rest = &caps[2];

    let parsed = match keyword.as_str() {
        "bundle" => {
            let mut words = rest.split_whitespace();
            match words.next() {
                Some(url) => checked_name(&bundle_name(url), line_no, "bundle").map(|()| {
                    DirectiveLine::Bundle {
                        url: url.to_string(),
                        git_ref: words.next().map(str::to_string),
                    }
                }),
                None => Err(ParseError::MissingArgument {
                    line: line_no,
                    directive: "bundle",
                }),
            }
        }
        "bundle-command" => {
            if rest.is_empty() {
                Err(ParseError::MissingArgument {
                    line: line_no,
                    directive: "bundle-command",
                })
            } else {
                Ok(DirectiveLine::Command(rest.to_string()))
            }
        }
        _ => match rest.split_whitespace().next() {
            Some(name) => checked_name(name, line_no, "static")
                .map(|()| DirectiveLine::Static(name.to_string())),
            None => Err(ParseError::MissingArgument {
                line: line_no,
                directive: "static",
            }),
        },
    };
    Some(parsed)
}

/// Reject names that would point at the bundle root or outside it.
fn checked_name(
    name: &str,
    line_no: usize,
    directive: &'static str,
) -> std::result::Result<(), ParseError> {
    if matches!(name, "" | "." | "..") {
        return Err(ParseError::InvalidName {
            line: line_no,
            directive,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Fold raw directive lines into directives.
///
/// The fold carries the index of the active bundle directive; a command with
/// no active bundle fails closed.
pub fn parse_directives<I, S>(lines: I) -> std::result::Result<Vec<Directive>, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut directives: Vec<Directive> = Vec::new();
    let mut active: Option<usize> = None;

    for item in DirectiveScanner::new(lines.into_iter()) {
        let (line, parsed) = item?;
        match parsed {
            DirectiveLine::Bundle { url, git_ref } => {
                directives.push(Directive::bundle(url, git_ref, line));
                active = Some(directives.len() - 1);
            }
            DirectiveLine::Command(command) => match active {
                Some(idx) => directives[idx].add_post_command(&command),
                None => return Err(ParseError::OrderError { line, command }),
            },
            DirectiveLine::Static(name) => directives.push(Directive::pinned(name, line)),
        }
    }

    validate_unique(&directives)?;
    Ok(directives)
}

/// Parse directives from a string.
pub fn parse_string(content: &str) -> std::result::Result<Vec<Directive>, ParseError> {
    parse_directives(content.lines())
}

/// Parse directives from a file.
pub fn parse_file(path: &Path) -> Result<Vec<Directive>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(parse_string(&content)?)
}

/// Reject directives that resolve to the same directory.
pub fn validate_unique(directives: &[Directive]) -> std::result::Result<(), ParseError> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for d in directives {
        if let Some(&first_line) = seen.get(d.name.as_str()) {
            return Err(ParseError::DuplicateName {
                name: d.name.clone(),
                first_line,
                line: d.line,
            });
        }
        seen.insert(&d.name, d.line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bundle() {
        let dirs = parse_string(r#"" Bundle: https://github.com/tpope/vim-fugitive.git"#).unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].name, "fugitive");
        assert_eq!(
            dirs[0].url.as_deref(),
            Some("https://github.com/tpope/vim-fugitive.git")
        );
        assert_eq!(dirs[0].git_ref, None);
        assert!(!dirs[0].is_static);
    }

    #[test]
    fn test_parse_bundle_with_ref() {
        let dirs = parse_string("bundle: git://example.com/bar.git v1.2").unwrap();
        assert_eq!(dirs[0].name, "bar");
        assert_eq!(dirs[0].git_ref.as_deref(), Some("v1.2"));
    }

    #[test]
    fn test_case_and_whitespace_tolerance() {
        let content = "   \"BUNDLE:   git://example.com/a.git\n\t\" bundle:git://example.com/b.git\n\"Static: c";
        let dirs = parse_string(content).unwrap();
        let names: Vec<_> = dirs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(dirs[2].is_static);
        assert_eq!(dirs[2].url, None);
    }

    #[test]
    fn test_ignores_other_lines() {
        let content = r#"
set nocompatible
" plain comment mentioning bundles
let g:bundle = 1
" Bundle: git://example.com/foo.git
"#;
        let dirs = parse_string(content).unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].line, 5);
    }

    #[test]
    fn test_command_attaches_to_previous_bundle() {
        let content = "\" Bundle: git://example.com/foo.git\n\" Static: mine\n\" Bundle-Command: make";
        let dirs = parse_string(content).unwrap();
        assert_eq!(dirs[0].post_command.as_deref(), Some("make"));
        assert_eq!(dirs[1].post_command, None);
    }

    #[test]
    fn test_orphan_command_fails() {
        let err = parse_string("\" Bundle-Command: make\n\" Bundle: git://example.com/foo.git")
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::OrderError {
                line: 1,
                command: "make".to_string()
            }
        );
    }

    #[test]
    fn test_command_after_static_only_fails() {
        let err = parse_string("\" Static: mine\n\" Bundle-Command: make").unwrap_err();
        assert!(matches!(err, ParseError::OrderError { line: 2, .. }));
    }

    #[test]
    fn test_missing_arguments() {
        assert!(matches!(
            parse_string("\" Bundle:").unwrap_err(),
            ParseError::MissingArgument { directive: "bundle", .. }
        ));
        assert!(matches!(
            parse_string("\" Static:   ").unwrap_err(),
            ParseError::MissingArgument { directive: "static", .. }
        ));
    }

    #[test]
    fn test_unusable_names_rejected() {
        for (content, name) in [
            ("\" Bundle: https://x/vim-.git", ""),
            ("\" Bundle: https://x/..", ".."),
            ("\" Bundle: https://x/./", "."),
        ] {
            let err = parse_string(&format!("set nocp\n{content}")).unwrap_err();
            assert_eq!(
                err,
                ParseError::InvalidName {
                    line: 2,
                    directive: "bundle",
                    name: name.to_string(),
                }
            );
        }
        assert!(matches!(
            parse_string("\" Static: ..").unwrap_err(),
            ParseError::InvalidName { directive: "static", .. }
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let content = "\" Bundle: https://a.example/vim-foo.git\n\" Bundle: https://b.example/foo";
        let err = parse_string(content).unwrap_err();
        assert_eq!(
            err,
            ParseError::DuplicateName {
                name: "foo".to_string(),
                first_line: 1,
                line: 2
            }
        );
    }

    #[test]
    fn test_static_collision_rejected() {
        let content = "\" Static: foo\n\" Bundle: https://a.example/foo.git";
        assert!(matches!(
            parse_string(content).unwrap_err(),
            ParseError::DuplicateName { .. }
        ));
    }

    #[test]
    fn test_scanner_is_lazy() {
        let mut consumed = 0;
        let lines = ["\" Bundle: git://x/a.git", "\" Bundle: git://x/b.git"]
            .into_iter()
            .inspect(|_| consumed += 1);
        let mut scanner = DirectiveScanner::new(lines);
        let first = scanner.next().unwrap().unwrap();
        assert_eq!(first.0, 1);
        drop(scanner);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vimrc");
        std::fs::write(&path, "\" Bundle: git://example.com/foo.git master\n").unwrap();
        let dirs = parse_file(&path).unwrap();
        assert_eq!(dirs[0].git_ref.as_deref(), Some("master"));
    }
}
