//! Accumulates interactions and writes them as a cassette.

use std::fmt::Display;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use super::format::{Cassette, Interaction};
use super::CassetteError;

/// Appends interactions in call order; [`Self::finish`] writes the file.
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Creates a recorder that will write to `path`.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { path: path.into(), name: name.into(), interactions: Vec::new() }
    }

    /// Number of interactions recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Records one interaction with a plain output.
    pub fn record(
        &mut self,
        port: &str,
        method: &str,
        input: &impl Serialize,
        output: &impl Serialize,
    ) {
        let seq = self.interactions.len() as u64;
        self.interactions.push(Interaction {
            seq,
            port: port.to_string(),
            method: method.to_string(),
            input: serde_json::to_value(input).unwrap_or_default(),
            output: serde_json::to_value(output).unwrap_or_default(),
        });
    }

    /// Records a fallible call as `{"Ok": value}` or `{"Err": message}`.
    pub fn record_result<T: Serialize, E: Display>(
        &mut self,
        port: &str,
        method: &str,
        input: &impl Serialize,
        result: &Result<T, E>,
    ) {
        let output = match result {
            Ok(value) => json!({ "Ok": serde_json::to_value(value).unwrap_or_default() }),
            Err(e) => json!({ "Err": e.to_string() }),
        };
        self.record(port, method, input, &output);
    }

    /// Writes the cassette and returns its path.
    ///
    /// # Errors
    ///
    /// Returns a [`CassetteError`] if the file cannot be written.
    pub fn finish(self) -> Result<PathBuf, CassetteError> {
        let cassette =
            Cassette { name: self.name, recorded_at: Utc::now(), interactions: self.interactions };
        cassette.save(&self.path)?;
        Ok(self.path)
    }
}

/// Whether a recorded output is an `{"Err": ..}` envelope.
pub(crate) fn is_error(output: &Value) -> bool {
    output.get("Err").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_use_ok_err_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell.cassette.yaml");

        let mut recorder = CassetteRecorder::new(&path, "shell");
        let ok: Result<u32, String> = Ok(0);
        let err: Result<u32, String> = Err("go: not found".into());
        recorder.record_result("shell", "run", &json!({"program": "go"}), &ok);
        recorder.record_result("shell", "run", &json!({"program": "go"}), &err);
        assert_eq!(recorder.len(), 2);

        let written = recorder.finish().unwrap();
        let cassette = Cassette::load(&written).unwrap();
        assert_eq!(cassette.interactions[0].output, json!({"Ok": 0}));
        assert!(is_error(&cassette.interactions[1].output));
        assert_eq!(cassette.interactions[1].seq, 1);
    }
}
