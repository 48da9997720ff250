//! Recording adapter for the `VersionControl` port.

use std::path::Path;

use serde::Serialize;

use super::record_result;
use crate::cassette::session::SharedRecorder;
use crate::ports::{PortError, VersionControl};

/// Records version-control calls while delegating to an inner implementation.
pub struct RecordingGit {
    inner: Box<dyn VersionControl>,
    recorder: SharedRecorder,
}

impl RecordingGit {
    /// Wraps `inner`, recording into `recorder`.
    pub fn new(inner: Box<dyn VersionControl>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }

    fn record<T: Serialize>(
        &self,
        method: &str,
        input: &impl Serialize,
        result: &Result<T, PortError>,
    ) {
        record_result(&self.recorder, "git", method, input, result);
    }
}

#[derive(Serialize)]
struct RepoInput<'a> {
    repo: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl<'a> RepoInput<'a> {
    fn repo(repo: &'a Path) -> Self {
        Self { repo, name: None, file: None, message: None }
    }
}

impl VersionControl for RecordingGit {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), PortError> {
        let result = self.inner.clone_repo(url, dest);
        self.record("clone_repo", &serde_json::json!({ "url": url, "dest": dest }), &result);
        result
    }

    fn current_commit(&self, repo: &Path) -> Result<String, PortError> {
        let result = self.inner.current_commit(repo);
        self.record("current_commit", &RepoInput::repo(repo), &result);
        result
    }

    fn current_branch(&self, repo: &Path) -> Result<String, PortError> {
        let result = self.inner.current_branch(repo);
        self.record("current_branch", &RepoInput::repo(repo), &result);
        result
    }

    fn create_branch(&self, repo: &Path, name: &str) -> Result<(), PortError> {
        let result = self.inner.create_branch(repo, name);
        let input = RepoInput { name: Some(name), ..RepoInput::repo(repo) };
        self.record("create_branch", &input, &result);
        result
    }

    fn commit(&self, repo: &Path, file: &Path, message: &str) -> Result<String, PortError> {
        let result = self.inner.commit(repo, file, message);
        let input = RepoInput { file: Some(file), message: Some(message), ..RepoInput::repo(repo) };
        self.record("commit", &input, &result);
        result
    }

    fn push(&self, repo: &Path, branch: &str) -> Result<(), PortError> {
        let result = self.inner.push(repo, branch);
        self.record("push", &RepoInput { name: Some(branch), ..RepoInput::repo(repo) }, &result);
        result
    }
}
