//! Version-control port for branch, commit and push operations.

use std::path::Path;

use super::PortError;

/// Version-control operations the drivers need on the target repository.
pub trait VersionControl: Send + Sync {
    /// Clones `url` into `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the clone fails.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), PortError>;

    /// Returns the hash of the current HEAD commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository has no commits or is invalid.
    fn current_commit(&self, repo: &Path) -> Result<String, PortError>;

    /// Returns the name of the checked-out branch.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch cannot be determined.
    fn current_branch(&self, repo: &Path) -> Result<String, PortError>;

    /// Creates (or switches to) the named branch.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch cannot be created or checked out.
    fn create_branch(&self, repo: &Path, name: &str) -> Result<(), PortError>;

    /// Stages `file` and commits it alone, returning the new commit hash.
    ///
    /// # Errors
    ///
    /// Returns an error if staging or committing fails.
    fn commit(&self, repo: &Path, file: &Path, message: &str) -> Result<String, PortError>;

    /// Pushes `branch` to the default remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the push fails.
    fn push(&self, repo: &Path, branch: &str) -> Result<(), PortError>;
}
