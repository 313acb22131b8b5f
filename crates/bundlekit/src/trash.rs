//! Moving bundles out of the way without deleting them.
//!
//! A bundle is archived by renaming its directory to the first free slot
//! `<name>-01` … `<name>-100` under the trash root. Existing slots are never
//! reused or merged into.

use crate::backend::Vcs;
use crate::error::{Error, Result};
use crate::manifest;
use crate::types::SyncMode;
use std::fs;
use std::path::{Path, PathBuf};

/// Highest slot number probed before giving up.
pub const MAX_SLOTS: usize = 100;

/// Archives bundle directories into the trash root.
pub struct Archiver<'a> {
    trash_root: PathBuf,
    vcs: &'a dyn Vcs,
    mode: &'a SyncMode,
}

impl<'a> Archiver<'a> {
    /// Create an archiver for `trash_root`.
    pub fn new(trash_root: impl Into<PathBuf>, vcs: &'a dyn Vcs, mode: &'a SyncMode) -> Self {
        Self {
            trash_root: trash_root.into(),
            vcs,
            mode,
        }
    }

    /// Trash root this archiver moves into.
    pub fn trash_root(&self) -> &Path {
        &self.trash_root
    }

    /// Move `dir` into the trash and return where it went.
    ///
    /// In submodule mode the path is first removed from the superproject's
    /// index. Stripping it from `.gitmodules` and `.git/config` and moving the
    /// module's git directory into the trashed copy are best-effort.
    pub fn archive(&self, dir: &Path) -> Result<PathBuf> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::io(
                    dir,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "no directory name"),
                )
            })?;

        fs::create_dir_all(&self.trash_root).map_err(|e| Error::io(&self.trash_root, e))?;
        let destination = next_free_slot(&self.trash_root, &name)?;

        let module_git_dir = if let SyncMode::Submodule { superproject } = self.mode {
            self.vcs.stage_removed_path(dir)?;
            unregister_submodule(superproject, dir);
            linked_git_dir(dir)
        } else {
            None
        };

        fs::rename(dir, &destination).map_err(|e| Error::io(dir, e))?;
        if let Some(git_dir) = module_git_dir {
            reclaim_git_dir(&git_dir, &destination);
        }
        log::info!("archived {} to {}", dir.display(), destination.display());
        Ok(destination)
    }
}

/// First unoccupied `<name>-NN` path under `trash_root`.
pub fn next_free_slot(trash_root: &Path, name: &str) -> Result<PathBuf> {
    (1..=MAX_SLOTS)
        .map(|n| trash_root.join(format!("{name}-{n:02}")))
        .find(|candidate| !candidate.exists() && !candidate.is_symlink())
        .ok_or_else(|| Error::TrashExhausted {
            name: name.to_string(),
            trash_root: trash_root.to_path_buf(),
            max: MAX_SLOTS,
        })
}

/// Drop a submodule's blocks from `.gitmodules` and `.git/config`.
fn unregister_submodule(superproject: &Path, dir: &Path) {
    let Ok(relative) = dir.strip_prefix(superproject) else {
        log::warn!(
            "{} is outside {}; leaving submodule config alone",
            dir.display(),
            superproject.display()
        );
        return;
    };
    let name = relative.to_string_lossy().replace('\\', "/");

    for file in [
        superproject.join(".gitmodules"),
        superproject.join(".git").join("config"),
    ] {
        match manifest::scrub_file(&file, &name) {
            Ok(true) => log::debug!("removed submodule {name} from {}", file.display()),
            Ok(false) => {}
            Err(e) => log::warn!("could not update {}: {e}", file.display()),
        }
    }
}

/// Git directory a `.git` file (`gitdir: <path>`) in `dir` points at.
fn linked_git_dir(dir: &Path) -> Option<PathBuf> {
    let dot_git = dir.join(".git");
    if !dot_git.is_file() {
        return None;
    }
    let text = fs::read_to_string(&dot_git).ok()?;
    let target = text
        .lines()
        .find_map(|line| line.strip_prefix("gitdir:"))
        .map(str::trim)?;
    // Resolved now: the relative form stops working once `dir` moves.
    fs::canonicalize(dir.join(target))
        .ok()
        .filter(|git_dir| git_dir.is_dir())
}

/// Move a submodule's git directory into its trashed checkout.
///
/// Leaving it under `.git/modules` blocks adding a submodule at the same
/// path again.
fn reclaim_git_dir(git_dir: &Path, checkout: &Path) {
    let dot_git = checkout.join(".git");
    let moved = fs::remove_file(&dot_git).and_then(|()| fs::rename(git_dir, &dot_git));
    if let Err(e) = moved {
        log::warn!(
            "could not move {} into {}: {e}",
            git_dir.display(),
            checkout.display()
        );
        return;
    }
    if let Err(e) = manifest::unset_worktree(&dot_git.join("config")) {
        log::warn!("could not update {}: {e}", dot_git.join("config").display());
    }
    log::debug!("moved {} to {}", git_dir.display(), dot_git.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeVcs;

    #[test]
    fn test_slots_are_numbered_and_never_reused() {
        let tmp = tempfile::tempdir().unwrap();
        let trash = tmp.path().join("trash");
        let vcs = FakeVcs::new();
        let mode = SyncMode::Clone;
        let archiver = Archiver::new(&trash, &vcs, &mode);

        for round in 1..=2 {
            let dir = tmp.path().join("foo");
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("round"), round.to_string()).unwrap();
            let dest = archiver.archive(&dir).unwrap();
            assert_eq!(dest, trash.join(format!("foo-{round:02}")));
            assert!(!dir.exists());
        }

        assert_eq!(fs::read_to_string(trash.join("foo-01/round")).unwrap(), "1");
        assert_eq!(fs::read_to_string(trash.join("foo-02/round")).unwrap(), "2");
    }

    #[test]
    fn test_slot_100_is_three_digits() {
        let tmp = tempfile::tempdir().unwrap();
        for n in 1..MAX_SLOTS {
            fs::create_dir(tmp.path().join(format!("foo-{n:02}"))).unwrap();
        }
        assert_eq!(
            next_free_slot(tmp.path(), "foo").unwrap(),
            tmp.path().join("foo-100")
        );
    }

    #[test]
    fn test_exhausted_trash() {
        let tmp = tempfile::tempdir().unwrap();
        for n in 1..=MAX_SLOTS {
            fs::create_dir(tmp.path().join(format!("foo-{n:02}"))).unwrap();
        }
        let err = next_free_slot(tmp.path(), "foo").unwrap_err();
        assert!(matches!(err, Error::TrashExhausted { max: 100, .. }));
    }

    #[test]
    fn test_submodule_archive_scrubs_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let dotfiles = tmp.path().join("dotfiles");
        let bundle = dotfiles.join(".vim/bundle/foo");
        fs::create_dir_all(&bundle).unwrap();
        fs::create_dir_all(dotfiles.join(".git")).unwrap();
        fs::write(
            dotfiles.join(".gitmodules"),
            "[submodule \".vim/bundle/foo\"]\n\tpath = .vim/bundle/foo\n\turl = x\n",
        )
        .unwrap();
        fs::write(
            dotfiles.join(".git/config"),
            "[core]\n\tbare = false\n[submodule \".vim/bundle/foo\"]\n\turl = x\n",
        )
        .unwrap();

        let vcs = FakeVcs::new();
        let mode = SyncMode::Submodule {
            superproject: dotfiles.clone(),
        };
        let archiver = Archiver::new(dotfiles.join(".vim/Trashed-Bundles"), &vcs, &mode);
        archiver.archive(&bundle).unwrap();

        assert_eq!(vcs.calls(), ["rm-cached foo"]);
        assert_eq!(fs::read_to_string(dotfiles.join(".gitmodules")).unwrap(), "");
        assert_eq!(
            fs::read_to_string(dotfiles.join(".git/config")).unwrap(),
            "[core]\n\tbare = false\n"
        );
        assert!(dotfiles.join(".vim/Trashed-Bundles/foo-01").exists());
    }

    #[test]
    fn test_submodule_archive_without_manifest_still_moves() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("bundle/foo");
        fs::create_dir_all(&bundle).unwrap();
        let vcs = FakeVcs::new();
        let mode = SyncMode::Submodule {
            superproject: tmp.path().to_path_buf(),
        };
        let dest = Archiver::new(tmp.path().join("trash"), &vcs, &mode)
            .archive(&bundle)
            .unwrap();
        assert!(dest.exists());
    }

    #[test]
    fn test_submodule_git_dir_moves_into_trashed_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let dotfiles = tmp.path().join("dotfiles");
        let bundle = dotfiles.join(".vim/bundle/foo");
        let module = dotfiles.join(".git/modules/.vim/bundle/foo");
        fs::create_dir_all(&bundle).unwrap();
        fs::create_dir_all(&module).unwrap();
        fs::write(
            bundle.join(".git"),
            "gitdir: ../../../.git/modules/.vim/bundle/foo\n",
        )
        .unwrap();
        fs::write(
            module.join("config"),
            "[core]\n\tbare = false\n\tworktree = ../../../../../.vim/bundle/foo\n",
        )
        .unwrap();

        let vcs = FakeVcs::new();
        let mode = SyncMode::Submodule {
            superproject: dotfiles.clone(),
        };
        let dest = Archiver::new(dotfiles.join(".vim/Trashed-Bundles"), &vcs, &mode)
            .archive(&bundle)
            .unwrap();

        assert!(!module.exists());
        assert!(dest.join(".git").is_dir());
        assert_eq!(
            fs::read_to_string(dest.join(".git/config")).unwrap(),
            "[core]\n\tbare = false\n"
        );
    }

    #[test]
    fn test_clone_mode_leaves_git_file_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = tmp.path().join("bundle/foo");
        let elsewhere = tmp.path().join("gitdirs/foo");
        fs::create_dir_all(&bundle).unwrap();
        fs::create_dir_all(&elsewhere).unwrap();
        fs::write(bundle.join(".git"), "gitdir: ../../gitdirs/foo\n").unwrap();

        let vcs = FakeVcs::new();
        let mode = SyncMode::Clone;
        let dest = Archiver::new(tmp.path().join("trash"), &vcs, &mode)
            .archive(&bundle)
            .unwrap();

        assert!(dest.join(".git").is_file());
        assert!(elsewhere.exists());
    }

    mod with_git {
        use super::*;
        use crate::backend::git::GitBackend;
        use std::process::Command;

        fn git(dir: &Path, args: &[&str]) {
            let output = Command::new("git")
                .arg("-C")
                .arg(dir)
                .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
                .args(args)
                .output()
                .unwrap();
            assert!(
                output.status.success(),
                "git {args:?}: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        fn upstream(root: &Path, name: &str) -> String {
            let repo = root.join("remotes").join(name);
            fs::create_dir_all(&repo).unwrap();
            git(&repo, &["init", "-q"]);
            fs::write(repo.join("plugin.vim"), name).unwrap();
            git(&repo, &["add", "plugin.vim"]);
            git(&repo, &["commit", "-q", "-m", "init"]);
            repo.to_string_lossy().into_owned()
        }

        fn superproject(root: &Path) -> PathBuf {
            let dotfiles = root.join("dotfiles");
            fs::create_dir_all(&dotfiles).unwrap();
            git(&dotfiles, &["init", "-q"]);
            dotfiles
        }

        fn submodule_backend(dotfiles: &Path) -> GitBackend {
            GitBackend::new()
                .with_superproject(dotfiles)
                .with_config("protocol.file.allow", "always")
        }

        #[test]
        fn test_archived_submodule_can_be_added_again() {
            if !GitBackend::new().is_available() {
                return;
            }
            let tmp = tempfile::tempdir().unwrap();
            let first = upstream(tmp.path(), "a");
            let second = upstream(tmp.path(), "b");
            let dotfiles = superproject(tmp.path());
            let bundle = dotfiles.join(".vim/bundle/foo");
            let backend = submodule_backend(&dotfiles);
            let mode = SyncMode::Submodule {
                superproject: dotfiles.clone(),
            };

            backend.add_submodule(&first, &bundle).unwrap();
            let dest = Archiver::new(dotfiles.join(".vim/Trashed-Bundles"), &backend, &mode)
                .archive(&bundle)
                .unwrap();

            assert!(!dotfiles.join(".git/modules/.vim/bundle/foo").exists());
            assert!(dest.join(".git").is_dir());
            assert_eq!(backend.current_origin_url(&dest).unwrap(), Some(first));

            backend.add_submodule(&second, &bundle).unwrap();
            assert_eq!(backend.current_origin_url(&bundle).unwrap(), Some(second));
        }

        #[test]
        fn test_untracked_directory_archives_in_submodule_mode() {
            if !GitBackend::new().is_available() {
                return;
            }
            let tmp = tempfile::tempdir().unwrap();
            let dotfiles = superproject(tmp.path());
            let loose = dotfiles.join(".vim/bundle/loose");
            fs::create_dir_all(&loose).unwrap();
            fs::write(loose.join("notes.txt"), "mine").unwrap();
            let backend = submodule_backend(&dotfiles);
            let mode = SyncMode::Submodule {
                superproject: dotfiles.clone(),
            };

            let dest = Archiver::new(dotfiles.join(".vim/Trashed-Bundles"), &backend, &mode)
                .archive(&loose)
                .unwrap();

            assert!(!loose.exists());
            assert_eq!(fs::read_to_string(dest.join("notes.txt")).unwrap(), "mine");
        }
    }
}
