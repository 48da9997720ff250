//! File-summary decoder (`coverage.py` JSON report).

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::{is_blank, relative_path, CoverageError, CoverageFormat, CoverageParser, FileCoverage};

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    files: BTreeMap<String, FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    summary: Summary,
    /// Line numbers live here; `summary.missing_lines` is only a count.
    #[serde(default)]
    missing_lines: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(default)]
    covered_lines: u64,
    #[serde(default)]
    num_statements: u64,
    #[serde(default)]
    percent_covered: Option<f64>,
}

/// Decodes per-file summaries; the percentage reported by the tool is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSummaryParser;

impl CoverageParser for FileSummaryParser {
    fn format(&self) -> CoverageFormat {
        CoverageFormat::FileSummary
    }

    fn parse(&self, raw: &[u8], repo_root: &Path) -> Result<Vec<FileCoverage>, CoverageError> {
        if is_blank(raw) {
            return Ok(Vec::new());
        }

        let doc: Document = serde_json::from_slice(raw)
            .map_err(|source| CoverageError::Malformed { format: self.format(), source })?;

        let mut files: Vec<FileCoverage> = doc
            .files
            .into_iter()
            .map(|(path, entry)| {
                let mut missing = entry.missing_lines;
                missing.sort_unstable();
                missing.dedup();

                let fc = FileCoverage::new(
                    relative_path(&path, repo_root),
                    entry.summary.num_statements,
                    entry.summary.covered_lines,
                    missing,
                );
                match entry.summary.percent_covered {
                    Some(reported) => fc.with_reported_percentage(reported),
                    None => fc,
                }
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}
