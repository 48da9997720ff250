//! Replaying adapter for the `VersionControl` port.

use std::path::Path;

use super::{next_result, SharedReplayer};
use crate::ports::{PortError, VersionControl};

/// Serves recorded version-control results in order.
pub struct ReplayingGit {
    replayer: SharedReplayer,
}

impl ReplayingGit {
    /// Creates an adapter backed by `replayer`.
    #[must_use]
    pub fn new(replayer: SharedReplayer) -> Self {
        Self { replayer }
    }
}

impl VersionControl for ReplayingGit {
    fn clone_repo(&self, _url: &str, _dest: &Path) -> Result<(), PortError> {
        next_result(&self.replayer, "git", "clone_repo")
    }

    fn current_commit(&self, _repo: &Path) -> Result<String, PortError> {
        next_result(&self.replayer, "git", "current_commit")
    }

    fn current_branch(&self, _repo: &Path) -> Result<String, PortError> {
        next_result(&self.replayer, "git", "current_branch")
    }

    fn create_branch(&self, _repo: &Path, _name: &str) -> Result<(), PortError> {
        next_result(&self.replayer, "git", "create_branch")
    }

    fn commit(&self, _repo: &Path, _file: &Path, _message: &str) -> Result<String, PortError> {
        next_result(&self.replayer, "git", "commit")
    }

    fn push(&self, _repo: &Path, _branch: &str) -> Result<(), PortError> {
        next_result(&self.replayer, "git", "push")
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::adapters::recording::RecordingGit;
    use crate::adapters::replaying::load_replayer;
    use crate::cassette::format::{Cassette, Interaction};
    use crate::ports::VersionControl;

    struct FixedGit;

    impl VersionControl for FixedGit {
        fn clone_repo(&self, _: &str, _: &Path) -> Result<(), PortError> {
            Ok(())
        }
        fn current_commit(&self, _: &Path) -> Result<String, PortError> {
            Ok("abc123".into())
        }
        fn current_branch(&self, _: &Path) -> Result<String, PortError> {
            Err("detached HEAD".into())
        }
        fn create_branch(&self, _: &Path, _: &str) -> Result<(), PortError> {
            Ok(())
        }
        fn commit(&self, _: &Path, _: &Path, _: &str) -> Result<String, PortError> {
            Ok("def456".into())
        }
        fn push(&self, _: &Path, _: &str) -> Result<(), PortError> {
            Ok(())
        }
    }

    #[test]
    fn replays_what_was_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let session = crate::cassette::session::RecordingSession::new(dir.path()).unwrap();
        {
            let git = RecordingGit::new(Box::new(FixedGit), std::sync::Arc::clone(&session.git));
            let repo = Path::new("/repo");
            git.current_commit(repo).unwrap();
            git.current_branch(repo).unwrap_err();
            git.create_branch(repo, "qtest/generated-tests").unwrap();
            git.commit(repo, Path::new("a_test.go"), "test: add a").unwrap();
        }
        let out = session.finish().unwrap();

        let git = ReplayingGit::new(load_replayer(&out).unwrap());
        let repo = Path::new("/elsewhere");
        assert_eq!(git.current_commit(repo).unwrap(), "abc123");
        assert_eq!(git.current_branch(repo).unwrap_err().to_string(), "detached HEAD");
        git.create_branch(repo, "x").unwrap();
        assert_eq!(git.commit(repo, Path::new("b"), "m").unwrap(), "def456");
        assert!(git.push(repo, "x").unwrap_err().to_string().contains("cassette exhausted"));
    }

    #[test]
    fn unit_results_replay_from_null() {
        let cassette = Cassette {
            name: "git".into(),
            recorded_at: Utc::now(),
            interactions: vec![Interaction {
                seq: 0,
                port: "git".into(),
                method: "push".into(),
                input: json!({}),
                output: json!({"Ok": null}),
            }],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("git.cassette.yaml");
        cassette.save(&path).unwrap();

        let git = ReplayingGit::new(load_replayer(&path).unwrap());
        git.push(Path::new("."), "main").unwrap();
    }
}
