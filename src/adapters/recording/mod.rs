//! Recording adapters: delegate to an inner port and append every call to a cassette.

pub mod git;
pub mod llm;
pub mod shell;

pub use git::RecordingGit;
pub use llm::RecordingLlmClient;
pub use shell::RecordingShellExecutor;

use std::fmt::Display;
use std::sync::PoisonError;

use serde::Serialize;

use crate::cassette::session::SharedRecorder;

/// Records a fallible call using the `{"Ok": ..}` / `{"Err": ..}` envelope.
///
/// A poisoned recorder is still written to; losing the cassette would hide
/// the very failure being debugged.
pub(crate) fn record_result<T: Serialize, E: Display>(
    recorder: &SharedRecorder,
    port: &str,
    method: &str,
    input: &impl Serialize,
    result: &Result<T, E>,
) {
    recorder
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .record_result(port, method, input, result);
}
