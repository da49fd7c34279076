//! Thin wrapper over the `git` binary for project history operations.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::error::VcsError;

/// Walks up from `start` looking for a directory containing `.git`.
pub fn find_repo_root(start: &Path) -> Result<PathBuf, VcsError> {
    let mut path = if start.is_dir() {
        start.to_path_buf()
    } else {
        start.parent().map(Path::to_path_buf).unwrap_or_default()
    };
    loop {
        if path.join(".git").is_dir() {
            return Ok(path);
        }
        if !path.pop() {
            return Err(VcsError::NoRepository(start.to_path_buf()));
        }
    }
}

/// A handle on the project's git repository.
///
/// The build loop uses this to roll a project back to its last committed
/// state when a pass fails, so the watcher does not spin on a file that can
/// never build.
#[derive(Debug, Clone)]
pub struct Repo {
    root: PathBuf,
}

impl Repo {
    /// Opens the repository enclosing `path`.
    pub fn discover(path: &Path) -> Result<Self, VcsError> {
        let root = find_repo_root(path)?;
        Ok(Self { root })
    }

    /// The repository root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stages a file.
    pub fn add(&self, file: &Path) -> Result<(), VcsError> {
        self.git("add", |cmd| {
            cmd.arg(file);
        })?;
        debug!(file = %file.display(), "staged");
        Ok(())
    }

    /// Commits the index with a message.
    pub fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.git("commit", |cmd| {
            cmd.arg("-m").arg(message);
        })?;
        info!(message, "committed");
        Ok(())
    }

    /// Reverts the last commit, keeping it in history.
    pub fn revert_last_commit(&self) -> Result<(), VcsError> {
        self.git("revert", |cmd| {
            cmd.arg("HEAD").arg("--no-edit");
        })?;
        info!("reverted the last commit");
        Ok(())
    }

    /// Discards every uncommitted change, staged or not, and every
    /// untracked file. The working tree ends up exactly at HEAD.
    pub fn discard_all_changes(&self) -> Result<(), VcsError> {
        self.git("reset", |cmd| {
            cmd.arg("--hard").arg("HEAD");
        })?;
        self.git("clean", |cmd| {
            cmd.arg("-fd");
        })?;
        info!("discarded all working tree changes");
        Ok(())
    }

    /// Whether the working tree matches HEAD with nothing untracked.
    pub fn is_clean(&self) -> Result<bool, VcsError> {
        let status = self.git("status", |cmd| {
            cmd.arg("--porcelain");
        })?;
        Ok(status.trim().is_empty())
    }

    /// The commit id at HEAD.
    pub fn head_id(&self) -> Result<String, VcsError> {
        let id = self.git("rev-parse", |cmd| {
            cmd.arg("HEAD");
        })?;
        Ok(id.trim().to_string())
    }

    fn git(&self, subcommand: &str, args: impl FnOnce(&mut Command)) -> Result<String, VcsError> {
        let mut cmd = Command::new("git");
        cmd.arg(subcommand).current_dir(&self.root);
        args(&mut cmd);
        let output = cmd.output().map_err(|source| VcsError::Spawn {
            command: subcommand.to_string(),
            source,
        })?;
        if !output.status.success() {
            return Err(VcsError::Command {
                command: subcommand.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Repo) {
        let dir = TempDir::new().unwrap();
        let run = |args: &[&str]| {
            let status = Command::new("git")
                .args(args)
                .current_dir(dir.path())
                .status()
                .unwrap();
            assert!(status.success(), "git {args:?} failed");
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "Test"]);
        let repo = Repo::discover(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn find_root_walks_up_from_nested_file() {
        let (dir, _repo) = init_repo();
        let nested = dir.path().join("parts/gear");
        fs::create_dir_all(&nested).unwrap();
        let file = nested.join("gear.rs");
        fs::write(&file, "").unwrap();
        assert_eq!(find_repo_root(&file).unwrap(), dir.path());
    }

    #[test]
    fn find_root_fails_outside_a_repository() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            find_repo_root(dir.path()),
            Err(VcsError::NoRepository(_))
        ));
    }

    #[test]
    fn add_commit_and_head() {
        let (dir, repo) = init_repo();
        let file = dir.path().join("model.rs");
        fs::write(&file, "// v1").unwrap();
        repo.add(&file).unwrap();
        repo.commit("initial model").unwrap();
        assert!(repo.is_clean().unwrap());
        assert_eq!(repo.head_id().unwrap().len(), 40);
    }

    #[test]
    fn discard_restores_committed_state() {
        let (dir, repo) = init_repo();
        let file = dir.path().join("model.rs");
        fs::write(&file, "// v1").unwrap();
        repo.add(&file).unwrap();
        repo.commit("initial model").unwrap();

        fs::write(&file, "// broken edit").unwrap();
        fs::write(dir.path().join("scratch.txt"), "junk").unwrap();
        assert!(!repo.is_clean().unwrap());

        repo.discard_all_changes().unwrap();
        assert!(repo.is_clean().unwrap());
        assert_eq!(fs::read_to_string(&file).unwrap(), "// v1");
        assert!(!dir.path().join("scratch.txt").exists());
    }

    #[test]
    fn revert_undoes_last_commit_content() {
        let (dir, repo) = init_repo();
        let file = dir.path().join("model.rs");
        fs::write(&file, "// v1").unwrap();
        repo.add(&file).unwrap();
        repo.commit("v1").unwrap();

        fs::write(&file, "// v2").unwrap();
        repo.add(&file).unwrap();
        repo.commit("v2").unwrap();

        repo.revert_last_commit().unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "// v1");
    }
}
