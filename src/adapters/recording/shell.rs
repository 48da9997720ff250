//! Recording adapter for the `ShellExecutor` port.

use super::record_result;
use crate::cassette::session::SharedRecorder;
use crate::ports::{CommandSpec, PortError, ShellExecutor, ShellOutput};

/// Records commands and their output while delegating to an inner executor.
pub struct RecordingShellExecutor {
    inner: Box<dyn ShellExecutor>,
    recorder: SharedRecorder,
}

impl RecordingShellExecutor {
    /// Wraps `inner`, recording into `recorder`.
    pub fn new(inner: Box<dyn ShellExecutor>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

impl ShellExecutor for RecordingShellExecutor {
    fn run(&self, command: &CommandSpec) -> Result<ShellOutput, PortError> {
        let result = self.inner.run(command);
        record_result(&self.recorder, "shell", "run", command, &result);
        result
    }
}
