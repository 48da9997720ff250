//! Record/replay of port interactions.
//!
//! A cassette is a YAML list of `(port, method, input, output)` tuples.
//! Recording adapters append to a [`recorder::CassetteRecorder`]; replaying
//! adapters pull outputs back in order from a [`replayer::CassetteReplayer`].

pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;

use std::path::PathBuf;

/// Errors raised while reading, writing or replaying cassettes.
#[derive(Debug, thiserror::Error)]
pub enum CassetteError {
    /// The cassette file could not be read or written.
    #[error("cassette I/O failed for {path}: {source}")]
    Io {
        /// Cassette path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The cassette is not valid YAML for the expected shape.
    #[error("invalid cassette {path}: {source}")]
    Yaml {
        /// Cassette path.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: serde_yaml::Error,
    },

    /// No recorded interaction is left for this port and method.
    #[error(
        "cassette exhausted: no more interactions for {port}::{method} (recorded: {available})"
    )]
    Exhausted {
        /// Port requested.
        port: String,
        /// Method requested.
        method: String,
        /// Port/method pairs present in the cassette.
        available: String,
    },

    /// A recording session directory already exists.
    #[error("cassette directory already exists: {0}")]
    DirectoryExists(PathBuf),

    /// A recorder was still shared when the session finished.
    #[error("recorder for {0} is still in use")]
    RecorderInUse(&'static str),
}
