//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::coverage::CoverageFormat;
use crate::model::Language;
use crate::ports::Tier;

/// Top-level CLI parser for `qtest`.
#[derive(Debug, Parser)]
#[command(name = "qtest", version, about = "Resumable, coverage-guided test generation")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a workspace for a repository.
    Init {
        /// Repository checkout (cloned here when `--url` is given and it does not exist).
        repo_path: PathBuf,
        /// Display name; defaults to the directory name.
        #[arg(long)]
        name: Option<String>,
        /// Remote to clone from.
        #[arg(long)]
        url: Option<String>,
    },
    /// List workspaces.
    List,
    /// Show a workspace's progress.
    Status {
        /// Workspace ID.
        id: String,
    },
    /// Discover targets and generate a test for each.
    Generate {
        /// Workspace ID.
        id: String,
        /// Generate specs without writing or committing tests.
        #[arg(long)]
        dry_run: bool,
        /// Write tests without committing them.
        #[arg(long)]
        no_commit: bool,
        /// Stop (paused) after this many targets.
        #[arg(long, value_name = "N")]
        max_tests: Option<usize>,
        /// Run the written tests afterwards.
        #[arg(long)]
        validate: bool,
        /// Model tier: 1/fast, 2/balanced, 3/thorough.
        #[arg(long, value_parser = parse_tier)]
        tier: Option<Tier>,
    },
    /// Continue a paused or interrupted generation run.
    Resume {
        /// Workspace ID.
        id: String,
    },
    /// Generate tests for uncovered code until a coverage target is met.
    Coverage {
        /// Workspace ID.
        id: String,
        /// Target coverage percentage.
        #[arg(long, default_value_t = 80.0)]
        target: f64,
        /// Maximum generation rounds.
        #[arg(long, default_value_t = 5)]
        max_iterations: usize,
        /// Maximum specs per round.
        #[arg(long, default_value_t = 10)]
        max_tests: usize,
        /// Keep gap order instead of sorting by priority.
        #[arg(long)]
        no_focus: bool,
        /// Generate specs without writing tests.
        #[arg(long)]
        dry_run: bool,
        /// Commit the generated test file after each round.
        #[arg(long)]
        commit: bool,
        /// Project language (detected from build files if omitted).
        #[arg(long, value_parser = parse_language)]
        language: Option<Language>,
    },
    /// Parse an existing coverage file into the workspace's coverage artifact.
    CoverageImport {
        /// Workspace ID.
        id: String,
        /// Coverage file to parse.
        file: PathBuf,
        /// Encoding of the file.
        #[arg(long, value_enum)]
        format: FormatArg,
    },
    /// Store mutation-testing results (JSON) as the workspace's mutation artifact.
    MutationImport {
        /// Workspace ID.
        id: String,
        /// Results file.
        file: PathBuf,
    },
    /// List a workspace's artifacts, or print one.
    Artifacts {
        /// Workspace ID.
        id: String,
        /// Artifact name (e.g. `summary`, `coverage.json`).
        name: Option<String>,
    },
}

/// Coverage file encodings accepted by `coverage-import`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// `go test -coverprofile` output.
    LineProfile,
    /// `coverage.py` JSON report.
    FileSummary,
    /// Istanbul `coverage-final.json`.
    StatementMap,
}

impl From<FormatArg> for CoverageFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::LineProfile => Self::LineProfile,
            FormatArg::FileSummary => Self::FileSummary,
            FormatArg::StatementMap => Self::StatementMap,
        }
    }
}

fn parse_tier(value: &str) -> Result<Tier, String> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "fast" => Ok(Tier::Fast),
        "2" | "balanced" => Ok(Tier::Balanced),
        "3" | "thorough" => Ok(Tier::Thorough),
        other => Err(format!("unknown tier `{other}` (expected 1-3, fast, balanced or thorough)")),
    }
}

fn parse_language(value: &str) -> Result<Language, String> {
    match Language::from_name(value) {
        Language::Unknown => Err(format!("unknown language `{value}`")),
        language => Ok(language),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_flags() {
        let cli = Cli::parse_from([
            "qtest",
            "generate",
            "ab12cd34",
            "--no-commit",
            "--max-tests",
            "3",
            "--tier",
            "fast",
        ]);
        match cli.command {
            Command::Generate { id, no_commit, max_tests, tier, dry_run, .. } => {
                assert_eq!(id, "ab12cd34");
                assert!(no_commit && !dry_run);
                assert_eq!(max_tests, Some(3));
                assert_eq!(tier, Some(Tier::Fast));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn coverage_defaults() {
        let cli = Cli::parse_from(["qtest", "coverage", "ab12cd34"]);
        match cli.command {
            Command::Coverage {
                target, max_iterations, max_tests, no_focus, commit, language, ..
            } => {
                assert!((target - 80.0).abs() < f64::EPSILON);
                assert_eq!((max_iterations, max_tests), (5, 10));
                assert!(!no_focus && !commit);
                assert_eq!(language, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn coverage_accepts_language_names() {
        let cli = Cli::parse_from(["qtest", "coverage", "x", "--language", "golang"]);
        assert!(matches!(cli.command, Command::Coverage { language: Some(Language::Go), .. }));
        assert!(Cli::try_parse_from(["qtest", "coverage", "x", "--language", "cobol"]).is_err());
    }

    #[test]
    fn coverage_import_requires_known_format() {
        let cli =
            Cli::parse_from(["qtest", "coverage-import", "x", "c.out", "--format", "line-profile"]);
        assert!(matches!(
            cli.command,
            Command::CoverageImport { format: FormatArg::LineProfile, .. }
        ));
        let lcov = ["qtest", "coverage-import", "x", "c.out", "--format", "lcov"];
        assert!(Cli::try_parse_from(lcov).is_err());
        assert!(Cli::try_parse_from(["qtest", "coverage-import", "x", "c.out"]).is_err());
    }

    #[test]
    fn rejects_unknown_tier() {
        assert!(Cli::try_parse_from(["qtest", "generate", "x", "--tier", "9"]).is_err());
        assert_eq!(parse_tier("3"), Ok(Tier::Thorough));
    }
}
