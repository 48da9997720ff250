//! Live version control using the `git` CLI.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::ports::{PortError, VersionControl};

/// Shells out to `git`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveGit;

fn git(repo: Option<&Path>, args: &[&str]) -> Result<String, PortError> {
    let mut cmd = Command::new("git");
    if let Some(repo) = repo {
        cmd.arg("-C").arg(repo);
    }
    debug!(args = ?args, "git");
    let output = cmd.args(args).output().map_err(|e| format!("failed to run git: {e}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("git {} failed: {}", args.join(" "), stderr.trim()).into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl VersionControl for LiveGit {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), PortError> {
        let dest = dest.to_string_lossy();
        git(None, &["clone", "--depth", "1", url, &dest]).map(drop)
    }

    fn current_commit(&self, repo: &Path) -> Result<String, PortError> {
        git(Some(repo), &["rev-parse", "HEAD"])
    }

    fn current_branch(&self, repo: &Path) -> Result<String, PortError> {
        git(Some(repo), &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    fn create_branch(&self, repo: &Path, name: &str) -> Result<(), PortError> {
        if git(Some(repo), &["checkout", "-b", name]).is_ok() {
            return Ok(());
        }
        git(Some(repo), &["checkout", name]).map(drop)
    }

    fn commit(&self, repo: &Path, file: &Path, message: &str) -> Result<String, PortError> {
        let file = file.to_string_lossy();
        git(Some(repo), &["add", "--", &file])?;
        git(Some(repo), &["commit", "-m", message, "--", &file])?;
        self.current_commit(repo)
    }

    fn push(&self, repo: &Path, branch: &str) -> Result<(), PortError> {
        git(Some(repo), &["push", "-u", "origin", branch]).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for args in [
            vec!["init", "-q", "-b", "main"],
            vec!["config", "user.email", "dev@example.com"],
            vec!["config", "user.name", "Dev"],
            vec!["commit", "-q", "--allow-empty", "-m", "root"],
        ] {
            git(Some(dir.path()), &args).unwrap();
        }
        dir
    }

    #[test]
    fn branches_and_commits_single_files() {
        let dir = init_repo();
        let repo = dir.path();
        let root = LiveGit.current_commit(repo).unwrap();

        LiveGit.create_branch(repo, "qtest/generated-tests").unwrap();
        assert_eq!(LiveGit.current_branch(repo).unwrap(), "qtest/generated-tests");

        std::fs::write(repo.join("a_test.py"), "def test_a():\n    pass\n").unwrap();
        std::fs::write(repo.join("untouched.txt"), "x").unwrap();
        let sha = LiveGit.commit(repo, Path::new("a_test.py"), "test: add a").unwrap();

        assert_ne!(sha, root);
        let files = git(Some(repo), &["show", "--name-only", "--format=", "HEAD"]).unwrap();
        assert_eq!(files, "a_test.py");
    }

    #[test]
    fn create_branch_switches_to_existing_branch() {
        let dir = init_repo();
        LiveGit.create_branch(dir.path(), "work").unwrap();
        git(Some(dir.path()), &["checkout", "-q", "main"]).unwrap();
        LiveGit.create_branch(dir.path(), "work").unwrap();
        assert_eq!(LiveGit.current_branch(dir.path()).unwrap(), "work");
    }
}
