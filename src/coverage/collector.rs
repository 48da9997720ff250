//! Runs a repository's test suite under its coverage tool and decodes the result.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{CoverageError, CoverageFormat, CoverageReport};
use crate::model::Language;
use crate::ports::{Clock, CommandSpec, ShellExecutor};

/// How to produce coverage for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageCommand {
    /// Command to run inside the repository.
    pub command: CommandSpec,
    /// File the tool writes its report to.
    pub output: PathBuf,
    /// Encoding of that file.
    pub format: CoverageFormat,
    /// Tool name recorded in the report.
    pub tool: &'static str,
}

impl CoverageCommand {
    /// Builds the coverage command for `language`, writing output under `scratch`.
    ///
    /// # Errors
    ///
    /// Returns [`CoverageError::UnsupportedLanguage`] for languages without a
    /// known coverage tool.
    pub fn for_language(
        language: Language,
        repo_root: &Path,
        scratch: &Path,
    ) -> Result<Self, CoverageError> {
        match language {
            Language::Go => {
                let output = scratch.join("coverage.out");
                Ok(Self {
                    command: CommandSpec::new(
                        "go",
                        [
                            "test".to_string(),
                            format!("-coverprofile={}", output.display()),
                            "-covermode=count".to_string(),
                            "./...".to_string(),
                        ],
                        repo_root,
                    ),
                    output,
                    format: CoverageFormat::LineProfile,
                    tool: "go cover",
                })
            }
            Language::Python => {
                let output = scratch.join("coverage.json");
                Ok(Self {
                    command: CommandSpec::new(
                        "python",
                        [
                            "-m".to_string(),
                            "pytest".to_string(),
                            "--cov=.".to_string(),
                            format!("--cov-report=json:{}", output.display()),
                            "-q".to_string(),
                        ],
                        repo_root,
                    ),
                    output,
                    format: CoverageFormat::FileSummary,
                    tool: "coverage.py",
                })
            }
            Language::JavaScript | Language::TypeScript => {
                let dir = scratch.join("coverage");
                Ok(Self {
                    command: CommandSpec::new(
                        "npx",
                        [
                            "jest".to_string(),
                            "--coverage".to_string(),
                            "--coverageReporters=json".to_string(),
                            format!("--coverageDirectory={}", dir.display()),
                        ],
                        repo_root,
                    ),
                    output: dir.join("coverage-final.json"),
                    format: CoverageFormat::StatementMap,
                    tool: "istanbul",
                })
            }
            other => Err(CoverageError::UnsupportedLanguage(other)),
        }
    }
}

/// Collects coverage through the shell port.
pub struct CoverageCollector<'a> {
    shell: &'a dyn ShellExecutor,
    clock: &'a dyn Clock,
    scratch: PathBuf,
}

impl<'a> CoverageCollector<'a> {
    /// Creates a collector that keeps raw tool output in `scratch`.
    pub fn new(
        shell: &'a dyn ShellExecutor,
        clock: &'a dyn Clock,
        scratch: impl Into<PathBuf>,
    ) -> Self {
        Self { shell, clock, scratch: scratch.into() }
    }

    /// Runs the coverage tool for `language` in `repo_root` and parses its output.
    ///
    /// A failing test suite is tolerated as long as the tool wrote its report.
    ///
    /// # Errors
    ///
    /// Returns a [`CoverageError`] if the language is unsupported, the command
    /// cannot be started, no report was written, or the report is malformed.
    pub fn collect(
        &self,
        repo_root: &Path,
        language: Language,
    ) -> Result<CoverageReport, CoverageError> {
        let cmd = CoverageCommand::for_language(language, repo_root, &self.scratch)?;
        fs::create_dir_all(&self.scratch)
            .map_err(|source| CoverageError::Read { path: self.scratch.clone(), source })?;
        // A stale report from an earlier round must not be mistaken for this one.
        let _ = fs::remove_file(&cmd.output);

        let rendered = cmd.command.display();
        info!(command = %rendered, "running coverage");
        let output = self
            .shell
            .run(&cmd.command)
            .map_err(|e| CoverageError::Spawn {
                command: rendered.clone(),
                message: e.to_string(),
            })?;
        debug!(stdout = %output.stdout, stderr = %output.stderr, "coverage command output");

        if !cmd.output.exists() {
            return Err(CoverageError::NoOutput { command: rendered, exit_code: output.exit_code });
        }
        if !output.success() {
            warn!(
                command = %rendered,
                exit_code = output.exit_code,
                "test suite failed; using partial coverage"
            );
        }

        let report = self.parse_file(&cmd.output, cmd.format, repo_root, language)?;
        let _ = fs::remove_file(&cmd.output);
        Ok(CoverageReport { tool: cmd.tool.to_string(), ..report })
    }

    /// Parses an existing coverage file without running anything.
    ///
    /// # Errors
    ///
    /// Returns a [`CoverageError`] if the file cannot be read or decoded.
    pub fn parse_file(
        &self,
        path: &Path,
        format: CoverageFormat,
        repo_root: &Path,
        language: Language,
    ) -> Result<CoverageReport, CoverageError> {
        let raw = fs::read(path)
            .map_err(|source| CoverageError::Read { path: path.to_path_buf(), source })?;
        let files = format.parser().parse(&raw, repo_root)?;
        let report = CoverageReport::from_files(files, language, format.as_str(), self.clock.now());
        info!(files = report.files.len(), coverage = report.percentage(), "parsed coverage");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::ports::{PortError, ShellOutput};

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z").unwrap().with_timezone(&Utc)
        }
    }

    /// Writes `contents` to `path` when run, then reports `exit_code`.
    struct ScriptedShell {
        write: Option<(PathBuf, String)>,
        exit_code: i32,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl ShellExecutor for ScriptedShell {
        fn run(&self, command: &CommandSpec) -> Result<ShellOutput, PortError> {
            self.calls.lock().unwrap().push(command.clone());
            if let Some((path, contents)) = &self.write {
                fs::create_dir_all(path.parent().unwrap())?;
                fs::write(path, contents)?;
            }
            Ok(ShellOutput {
                exit_code: self.exit_code,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    fn command(language: Language) -> Result<CoverageCommand, CoverageError> {
        CoverageCommand::for_language(language, Path::new("/r"), Path::new("/s"))
    }

    #[test]
    fn go_command_shape() {
        let cmd = command(Language::Go).unwrap();
        assert_eq!(cmd.command.program, "go");
        assert_eq!(
            cmd.command.args,
            ["test", "-coverprofile=/s/coverage.out", "-covermode=count", "./..."]
        );
        assert_eq!(cmd.format, CoverageFormat::LineProfile);
    }

    #[test]
    fn jest_reads_final_json_from_coverage_directory() {
        let cmd = command(Language::TypeScript).unwrap();
        assert_eq!(cmd.output, Path::new("/s/coverage/coverage-final.json"));
        assert_eq!(cmd.format, CoverageFormat::StatementMap);
    }

    #[test]
    fn unsupported_language_is_rejected() {
        let err = command(Language::Java).unwrap_err();
        assert!(matches!(err, CoverageError::UnsupportedLanguage(Language::Java)));
    }

    #[test]
    fn failing_suite_with_report_still_yields_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("scratch");
        let shell = ScriptedShell {
            write: Some((
                scratch.join("coverage.out"),
                "mode: count\nm.go:1.1,4.2 4 1\nm.go:5.1,8.2 4 0\n".into(),
            )),
            exit_code: 1,
            calls: Mutex::new(Vec::new()),
        };
        let collector = CoverageCollector::new(&shell, &FixedClock, &scratch);

        let report = collector.collect(dir.path(), Language::Go).unwrap();
        assert_eq!(report.tool, "go cover");
        assert!((report.percentage() - 50.0).abs() < 1e-9);
        assert_eq!(report.generated_at, FixedClock.now());
        assert!(!scratch.join("coverage.out").exists());
        assert_eq!(shell.calls.lock().unwrap()[0].cwd, dir.path());
    }

    #[test]
    fn missing_report_is_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let shell = ScriptedShell { write: None, exit_code: 2, calls: Mutex::new(Vec::new()) };
        let collector = CoverageCollector::new(&shell, &FixedClock, dir.path().join("scratch"));

        let err = collector.collect(dir.path(), Language::Python).unwrap_err();
        assert!(matches!(err, CoverageError::NoOutput { exit_code: 2, .. }));
    }

    #[test]
    fn parse_file_imports_existing_report() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("coverage-final.json");
        fs::write(&file, r#"{"src/a.js": {"s": {"0": 1, "1": 1, "2": 0, "3": 0}}}"#).unwrap();
        let shell = ScriptedShell { write: None, exit_code: 0, calls: Mutex::new(Vec::new()) };
        let collector = CoverageCollector::new(&shell, &FixedClock, dir.path());

        let report = collector
            .parse_file(&file, CoverageFormat::StatementMap, dir.path(), Language::JavaScript)
            .unwrap();
        assert_eq!(report.tool, "statement-map");
        assert_eq!(report.summary.covered_lines, 2);
        assert!(shell.calls.lock().unwrap().is_empty());
    }
}
