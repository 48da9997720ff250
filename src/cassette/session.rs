//! A recording session: one cassette per recorded port under a timestamped directory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::recorder::CassetteRecorder;
use super::CassetteError;

/// Shared recorder handle held by the recording adapters.
pub type SharedRecorder = Arc<Mutex<CassetteRecorder>>;

/// Recorders for the nondeterministic ports (`llm`, `shell`, `git`).
pub struct RecordingSession {
    /// LLM completions.
    pub llm: SharedRecorder,
    /// Shell commands.
    pub shell: SharedRecorder,
    /// Version-control calls.
    pub git: SharedRecorder,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Starts a session writing to `<base>/<timestamp>/<port>.cassette.yaml`.
    ///
    /// # Errors
    ///
    /// Returns a [`CassetteError`] if the directory exists or cannot be created.
    pub fn new(base: &Path) -> Result<Self, CassetteError> {
        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let output_dir = base.join(&stamp);
        if output_dir.exists() {
            return Err(CassetteError::DirectoryExists(output_dir));
        }
        std::fs::create_dir_all(&output_dir)
            .map_err(|source| CassetteError::Io { path: output_dir.clone(), source })?;

        let recorder = |port: &str| -> SharedRecorder {
            let path = output_dir.join(format!("{port}.cassette.yaml"));
            Arc::new(Mutex::new(CassetteRecorder::new(path, format!("{stamp}-{port}"))))
        };
        Ok(Self {
            llm: recorder("llm"),
            shell: recorder("shell"),
            git: recorder("git"),
            output_dir,
        })
    }

    /// Directory the cassettes are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every cassette. All adapters holding recorders must be dropped first.
    ///
    /// # Errors
    ///
    /// Returns a [`CassetteError`] if a recorder is still shared or a file cannot be written.
    pub fn finish(self) -> Result<PathBuf, CassetteError> {
        fn finish_one(recorder: SharedRecorder, port: &'static str) -> Result<(), CassetteError> {
            let recorder =
                Arc::try_unwrap(recorder).map_err(|_| CassetteError::RecorderInUse(port))?;
            recorder.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner).finish()?;
            Ok(())
        }

        finish_one(self.llm, "llm")?;
        finish_one(self.shell, "shell")?;
        finish_one(self.git, "git")?;
        Ok(self.output_dir)
    }
}
