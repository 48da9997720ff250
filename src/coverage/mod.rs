//! Normalized coverage model and the format-specific decoders feeding it.
//!
//! Three coverage tools write three incompatible documents. Each has a
//! [`CoverageParser`] implementation selected by its [`CoverageFormat`] tag;
//! all of them produce the same [`FileCoverage`] list, which
//! [`CoverageReport::from_files`] aggregates.

pub mod collector;
mod profile;
mod statement_map;
mod summary;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Language;

pub use collector::{CoverageCollector, CoverageCommand};
pub use profile::LineProfileParser;
pub use statement_map::StatementMapParser;
pub use summary::FileSummaryParser;

/// Version string written into coverage artifacts.
pub const REPORT_VERSION: &str = "1.0";

/// Errors raised while collecting or decoding coverage.
#[derive(Debug, thiserror::Error)]
pub enum CoverageError {
    /// The coverage file could not be read.
    #[error("failed to read coverage data at {path}: {source}")]
    Read {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document root is not what the format expects.
    #[error("invalid {format} coverage document: {source}")]
    Malformed {
        /// Format being decoded.
        format: CoverageFormat,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// No coverage tool is wired up for this language.
    #[error("unsupported language for coverage: {0}")]
    UnsupportedLanguage(Language),

    /// The coverage command could not be started.
    #[error("failed to run `{command}`: {message}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Spawn failure.
        message: String,
    },

    /// The command ran but left no coverage file behind.
    #[error("`{command}` exited with code {exit_code} and produced no coverage output")]
    NoOutput {
        /// Rendered command line.
        command: String,
        /// Process exit code.
        exit_code: i32,
    },
}

/// On-disk coverage encoding understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverageFormat {
    /// Line-oriented block profile (`go test -coverprofile`).
    LineProfile,
    /// Per-file summary JSON (`coverage.py json`).
    FileSummary,
    /// Per-statement hit map JSON (Istanbul `coverage-final.json`).
    StatementMap,
}

impl CoverageFormat {
    /// Every supported format.
    pub const ALL: [Self; 3] = [Self::LineProfile, Self::FileSummary, Self::StatementMap];

    /// Returns the decoder for this format.
    #[must_use]
    pub fn parser(self) -> &'static dyn CoverageParser {
        match self {
            Self::LineProfile => &LineProfileParser,
            Self::FileSummary => &FileSummaryParser,
            Self::StatementMap => &StatementMapParser,
        }
    }

    /// Kebab-case name used on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LineProfile => "line-profile",
            Self::FileSummary => "file-summary",
            Self::StatementMap => "statement-map",
        }
    }
}

impl fmt::Display for CoverageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoverageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|f| f.as_str() == s).ok_or_else(|| {
            format!(
                "unknown coverage format {s:?} \
                 (expected line-profile, file-summary or statement-map)"
            )
        })
    }
}

/// Decodes one coverage encoding into the normalized per-file model.
///
/// Implementations are pure: bytes in, file list out. Empty input yields an
/// empty list; only a structurally invalid document is an error.
pub trait CoverageParser: Send + Sync {
    /// The format this parser decodes.
    fn format(&self) -> CoverageFormat;

    /// Decodes `raw`, making paths relative to `repo_root` where they are absolute.
    ///
    /// # Errors
    ///
    /// Returns [`CoverageError::Malformed`] if the document root cannot be decoded.
    fn parse(&self, raw: &[u8], repo_root: &Path) -> Result<Vec<FileCoverage>, CoverageError>;
}

/// Coverage of one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCoverage {
    /// Path relative to the repository root when it could be made relative.
    pub path: String,
    /// Measurable units (statements or lines).
    pub total_lines: u64,
    /// Units executed at least once.
    pub covered_lines: u64,
    /// Cached `covered / total * 100`.
    pub percentage: f64,
    /// Uncovered line numbers, sorted, when the format provides them.
    #[serde(default)]
    pub uncovered_lines: Vec<u32>,
}

impl FileCoverage {
    /// Builds a file entry, clamping `covered` to `total` and computing the percentage.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        total: u64,
        covered: u64,
        uncovered_lines: Vec<u32>,
    ) -> Self {
        let covered = covered.min(total);
        Self {
            path: path.into(),
            total_lines: total,
            covered_lines: covered,
            percentage: percentage(covered, total),
            uncovered_lines,
        }
    }

    /// Replaces the computed percentage with one reported by the coverage tool.
    ///
    /// Some tools fold branch coverage into their per-file figure, so it can
    /// legitimately differ from the line ratio. Out-of-range values are ignored.
    #[must_use]
    pub fn with_reported_percentage(mut self, reported: f64) -> Self {
        if reported.is_finite() && (0.0..=100.0).contains(&reported) {
            self.percentage = reported;
        }
        self
    }

    /// Number of units not covered.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.total_lines - self.covered_lines
    }
}

/// Aggregate totals across all files of a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Sum of measurable units.
    pub total_lines: u64,
    /// Sum of covered units.
    pub covered_lines: u64,
    /// Weighted average coverage.
    pub coverage_percent: f64,
    /// Weighted coverage per parent directory.
    #[serde(default)]
    pub by_package: BTreeMap<String, f64>,
}

/// Normalized coverage for a whole repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Document version.
    pub version: String,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// Tool that produced the raw data.
    pub tool: String,
    /// Repository language.
    pub language: Language,
    /// Aggregated totals.
    pub summary: CoverageSummary,
    /// Per-file entries.
    pub files: Vec<FileCoverage>,
}

impl CoverageReport {
    /// Aggregates per-file entries into a report.
    #[must_use]
    pub fn from_files(
        files: Vec<FileCoverage>,
        language: Language,
        tool: impl Into<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut summary = CoverageSummary::default();
        let mut packages: BTreeMap<String, (u64, u64)> = BTreeMap::new();

        for file in &files {
            summary.total_lines = summary.total_lines.saturating_add(file.total_lines);
            summary.covered_lines = summary.covered_lines.saturating_add(file.covered_lines);

            let package = Path::new(&file.path)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| ".".to_string());
            let entry = packages.entry(package).or_default();
            entry.0 = entry.0.saturating_add(file.total_lines);
            entry.1 = entry.1.saturating_add(file.covered_lines);
        }

        summary.coverage_percent = percentage(summary.covered_lines, summary.total_lines);
        summary.by_package = packages
            .into_iter()
            .map(|(pkg, (total, covered))| (pkg, percentage(covered, total)))
            .collect();

        Self {
            version: REPORT_VERSION.to_string(),
            generated_at,
            tool: tool.into(),
            language,
            summary,
            files,
        }
    }

    /// An empty report, used when the first collection of a run fails.
    #[must_use]
    pub fn empty(language: Language, generated_at: DateTime<Utc>) -> Self {
        Self::from_files(Vec::new(), language, "none", generated_at)
    }

    /// Weighted-average coverage percentage.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.summary.coverage_percent
    }

    /// Looks up a file entry by relative path.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&FileCoverage> {
        self.files.iter().find(|f| f.path == path)
    }

    /// One-line summary for logs and the CLI.
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "Coverage: {:.1}% ({}/{} lines)",
            self.summary.coverage_percent, self.summary.covered_lines, self.summary.total_lines
        )
    }
}

/// `covered / total * 100`, or 0 when there is nothing to measure.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64 * 100.0
    }
}

/// Strips `repo_root` from an absolute path; other paths pass through unchanged.
pub(crate) fn relative_path(path: &str, repo_root: &Path) -> String {
    let root = repo_root.to_string_lossy();
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return path.to_string();
    }
    match path.strip_prefix(root) {
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
        _ => path.to_string(),
    }
}

/// Returns `true` when `raw` holds nothing but whitespace.
pub(crate) fn is_blank(raw: &[u8]) -> bool {
    raw.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn file_coverage_computes_percentage() {
        let fc = FileCoverage::new("a.go", 8, 5, vec![]);
        assert!((fc.percentage - 62.5).abs() < 1e-9);
        assert_eq!(fc.missed(), 3);
    }

    #[test]
    fn file_coverage_with_no_units_is_zero_percent() {
        let fc = FileCoverage::new("empty.go", 0, 0, vec![]);
        assert!(fc.percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn covered_is_clamped_to_total() {
        let fc = FileCoverage::new("odd.py", 4, 9, vec![]);
        assert_eq!(fc.covered_lines, 4);
        assert!((fc.percentage - 100.0).abs() < 1e-9);
    }

    #[test]
    fn report_weights_by_file_size() {
        let report = CoverageReport::from_files(
            vec![
                FileCoverage::new("pkg/a.go", 100, 80, vec![]),
                FileCoverage::new("pkg/b.go", 50, 40, vec![]),
                FileCoverage::new("main.go", 50, 0, vec![]),
            ],
            Language::Go,
            "go cover",
            at(),
        );
        assert_eq!(report.summary.total_lines, 200);
        assert_eq!(report.summary.covered_lines, 120);
        assert!((report.percentage() - 60.0).abs() < 1e-9);
        assert!((report.summary.by_package["pkg"] - 80.0).abs() < 1e-9);
        assert!(report.summary.by_package["."].abs() < 1e-9);
    }

    #[test]
    fn empty_report_has_zero_coverage() {
        let report = CoverageReport::empty(Language::Python, at());
        assert!(report.files.is_empty());
        assert!(report.percentage().abs() < f64::EPSILON);
        assert_eq!(report.summary_line(), "Coverage: 0.0% (0/0 lines)");
    }

    #[test]
    fn relative_path_strips_repo_root() {
        let root = Path::new("/work/repo");
        assert_eq!(relative_path("/work/repo/src/app.py", root), "src/app.py");
        assert_eq!(relative_path("/work/repository/x.py", root), "/work/repository/x.py");
        assert_eq!(relative_path("pkg/main.go", root), "pkg/main.go");
    }

    #[test]
    fn format_round_trips_through_its_name() {
        for format in CoverageFormat::ALL {
            assert_eq!(format.as_str().parse::<CoverageFormat>().unwrap(), format);
            assert_eq!(format.parser().format(), format);
        }
        assert!("lcov".parse::<CoverageFormat>().is_err());
    }

    #[test]
    fn every_parser_returns_empty_list_for_empty_input() {
        for format in CoverageFormat::ALL {
            let files = format.parser().parse(b"", Path::new("/repo")).unwrap();
            assert!(files.is_empty(), "{format} should accept empty input");
            let files = format.parser().parse(b"  \n", Path::new("/repo")).unwrap();
            assert!(files.is_empty(), "{format} should accept blank input");
        }
    }
}
