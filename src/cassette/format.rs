//! On-disk cassette shape.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CassetteError;

/// One recorded call on a port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Position in the recording.
    pub seq: u64,
    /// Port name (`llm`, `shell`, `git`).
    pub port: String,
    /// Method invoked on the port.
    pub method: String,
    /// Call arguments.
    pub input: serde_json::Value,
    /// Result, as `{"Ok": ..}` or `{"Err": "message"}` for fallible calls.
    pub output: serde_json::Value,
}

/// A named, ordered list of interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Cassette name.
    pub name: String,
    /// When recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Recorded interactions in call order.
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    /// Reads a cassette from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns a [`CassetteError`] if the file is unreadable or malformed.
    pub fn load(path: &Path) -> Result<Self, CassetteError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CassetteError::Io { path: path.to_path_buf(), source })?;
        serde_yaml::from_str(&raw)
            .map_err(|source| CassetteError::Yaml { path: path.to_path_buf(), source })
    }

    /// Writes the cassette as YAML.
    ///
    /// # Errors
    ///
    /// Returns a [`CassetteError`] if encoding or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), CassetteError> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|source| CassetteError::Yaml { path: path.to_path_buf(), source })?;
        fs::write(path, yaml)
            .map_err(|source| CassetteError::Io { path: path.to_path_buf(), source })
    }
}
