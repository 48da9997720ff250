//! Replaying adapters: serve recorded outputs instead of touching the world.

pub mod git;
pub mod llm;
pub mod shell;

pub use git::ReplayingGit;
pub use llm::ReplayingLlmClient;
pub use shell::ReplayingShellExecutor;

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::de::DeserializeOwned;

use crate::cassette::format::Cassette;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::CassetteError;
use crate::ports::PortError;

/// Replayer shared by every replaying adapter of one context.
pub type SharedReplayer = Arc<Mutex<CassetteReplayer>>;

/// Loads a cassette file, or every `*.cassette.yaml` in a recording directory.
///
/// # Errors
///
/// Returns a [`CassetteError`] if a cassette cannot be read or parsed.
pub fn load_replayer(path: &Path) -> Result<SharedReplayer, CassetteError> {
    let cassette = if path.is_dir() {
        let mut files: Vec<_> = std::fs::read_dir(path)
            .map_err(|source| CassetteError::Io { path: path.to_path_buf(), source })?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.to_string_lossy().ends_with(".cassette.yaml"))
            .collect();
        files.sort();

        let mut merged = Cassette {
            name: path.display().to_string(),
            recorded_at: Utc::now(),
            interactions: Vec::new(),
        };
        for file in files {
            merged.interactions.extend(Cassette::load(&file)?.interactions);
        }
        merged
    } else {
        Cassette::load(path)?
    };
    Ok(Arc::new(Mutex::new(CassetteReplayer::new(&cassette))))
}

pub(crate) fn next_result<T: DeserializeOwned>(
    replayer: &SharedReplayer,
    port: &str,
    method: &str,
) -> Result<T, PortError> {
    replayer.lock().unwrap_or_else(PoisonError::into_inner).next_result(port, method)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cassette::session::RecordingSession;

    #[test]
    fn loads_every_cassette_in_a_session_directory() {
        let dir = tempfile::tempdir().unwrap();
        let session = RecordingSession::new(dir.path()).unwrap();
        let main = json!({"Ok": "main"});
        session.git.lock().unwrap().record("git", "current_branch", &json!({}), &main);
        session.shell.lock().unwrap().record("shell", "run", &json!({}), &json!({"Err": "boom"}));
        let out = session.finish().unwrap();

        let replayer = load_replayer(&out).unwrap();
        let branch: String = next_result(&replayer, "git", "current_branch").unwrap();
        assert_eq!(branch, "main");
        let err = next_result::<serde_json::Value>(&replayer, "shell", "run").unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
