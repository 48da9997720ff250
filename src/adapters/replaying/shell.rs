//! Replaying adapter for the `ShellExecutor` port.

use super::{next_result, SharedReplayer};
use crate::ports::{CommandSpec, PortError, ShellExecutor, ShellOutput};

/// Serves recorded command output in order.
pub struct ReplayingShellExecutor {
    replayer: SharedReplayer,
}

impl ReplayingShellExecutor {
    /// Creates an executor backed by `replayer`.
    #[must_use]
    pub fn new(replayer: SharedReplayer) -> Self {
        Self { replayer }
    }
}

impl ShellExecutor for ReplayingShellExecutor {
    fn run(&self, _command: &CommandSpec) -> Result<ShellOutput, PortError> {
        next_result(&self.replayer, "shell", "run")
    }
}
