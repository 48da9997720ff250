//! Live shell executor using `std::process::Command`.

use std::process::Command;

use tracing::debug;

use crate::ports::{CommandSpec, PortError, ShellExecutor, ShellOutput};

/// Spawns the program directly (no shell interpolation) in the requested directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveShellExecutor;

impl ShellExecutor for LiveShellExecutor {
    fn run(&self, command: &CommandSpec) -> Result<ShellOutput, PortError> {
        debug!(command = %command.display(), cwd = %command.cwd.display(), "spawning");
        let output = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .output()
            .map_err(|e| format!("failed to run {}: {e}", command.program))?;
        Ok(ShellOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_program_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("pwd", Vec::<String>::new(), dir.path());
        let result = LiveShellExecutor.run(&spec).unwrap();

        assert!(result.success());
        let reported = std::fs::canonicalize(result.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn captures_exit_code() {
        let result =
            LiveShellExecutor.run(&CommandSpec::new("sh", ["-c", "exit 42"], ".")).unwrap();
        assert_eq!(result.exit_code, 42);
    }

    #[test]
    fn missing_program_is_an_error() {
        let spec = CommandSpec::new("qtest-no-such-program", ["x"], ".");
        assert!(LiveShellExecutor.run(&spec).is_err());
    }
}
