//! Core library entry for the `qtest` CLI.
//!
//! `qtest` walks a repository, generates one test per exported function
//! through an LLM, and tracks progress in a resumable on-disk workspace. A
//! second driver loops on measured coverage, targeting uncovered blocks.

pub mod adapters;
pub mod cancel;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod coverage;
pub mod logging;
pub mod model;
pub mod ports;
pub mod workspace;

use clap::error::ErrorKind;
use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
/// `--help` and `--version` print to stdout and succeed.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return err.print().map_err(|e| e.to_string());
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli.command)
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run(["qtest", "unknown"]);
        assert!(result.is_err());
    }

    #[test]
    fn help_is_not_an_error() {
        assert!(run(["qtest", "--help"]).is_ok());
    }

    #[test]
    fn run_errors_on_missing_workspace_id() {
        assert!(run(["qtest", "status"]).is_err());
    }
}
