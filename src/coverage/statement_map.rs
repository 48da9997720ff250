//! Statement-map decoder (Istanbul `coverage-final.json`).

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use super::{is_blank, relative_path, CoverageError, CoverageFormat, CoverageParser, FileCoverage};

#[derive(Debug, Deserialize)]
struct FileEntry {
    #[serde(default)]
    s: BTreeMap<String, u64>,
    #[serde(default, rename = "statementMap")]
    statement_map: BTreeMap<String, Location>,
}

#[derive(Debug, Deserialize)]
struct Location {
    start: Position,
}

#[derive(Debug, Deserialize)]
struct Position {
    line: u32,
}

/// Decodes per-statement hit maps.
///
/// Uncovered line numbers are only reported for statements whose location
/// appears in `statementMap`; without it the list stays empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementMapParser;

impl CoverageParser for StatementMapParser {
    fn format(&self) -> CoverageFormat {
        CoverageFormat::StatementMap
    }

    fn parse(&self, raw: &[u8], repo_root: &Path) -> Result<Vec<FileCoverage>, CoverageError> {
        if is_blank(raw) {
            return Ok(Vec::new());
        }

        let doc: BTreeMap<String, FileEntry> = serde_json::from_slice(raw)
            .map_err(|source| CoverageError::Malformed { format: self.format(), source })?;

        let mut files: Vec<FileCoverage> = doc
            .into_iter()
            .map(|(path, entry)| {
                let total = entry.s.len() as u64;
                let covered = entry.s.values().filter(|&&hits| hits > 0).count() as u64;
                let uncovered: BTreeSet<u32> = entry
                    .s
                    .iter()
                    .filter(|(_, &hits)| hits == 0)
                    .filter_map(|(id, _)| entry.statement_map.get(id).map(|loc| loc.start.line))
                    .collect();

                let path = relative_path(&path, repo_root);
                FileCoverage::new(path, total, covered, uncovered.into_iter().collect())
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_statements_with_hits() {
        let raw = br#"{"/repo/src/cart.js": {"s": {"0": 3, "1": 0, "2": 1, "3": 0}}}"#;
        let files = StatementMapParser.parse(raw, Path::new("/repo")).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "src/cart.js");
        assert_eq!(files[0].total_lines, 4);
        assert_eq!(files[0].covered_lines, 2);
        assert!((files[0].percentage - 50.0).abs() < 1e-9);
        assert!(files[0].uncovered_lines.is_empty());
    }

    #[test]
    fn recovers_lines_from_statement_map() {
        let raw = br#"{
            "src/a.ts": {
                "path": "src/a.ts",
                "statementMap": {
                    "0": {"start": {"line": 2, "column": 0}, "end": {"line": 2, "column": 9}},
                    "1": {"start": {"line": 7, "column": 2}, "end": {"line": 9, "column": 3}},
                    "2": {"start": {"line": 4, "column": 2}, "end": {"line": 4, "column": 8}}
                },
                "s": {"0": 1, "1": 0, "2": 0}
            }
        }"#;
        let files = StatementMapParser.parse(raw, Path::new("/repo")).unwrap();
        assert_eq!(files[0].uncovered_lines, vec![4, 7]);
    }

    #[test]
    fn output_is_sorted_by_path() {
        let raw = br#"{"z.js": {"s": {"0": 1}}, "a.js": {"s": {}}}"#;
        let files = StatementMapParser.parse(raw, Path::new("/repo")).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["a.js", "z.js"]);
        assert_eq!(files[0].total_lines, 0);
        assert!(files[0].percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn empty_object_is_empty() {
        assert!(StatementMapParser.parse(b"{}", Path::new("/repo")).unwrap().is_empty());
    }

    #[test]
    fn array_root_is_an_error() {
        let err = StatementMapParser.parse(b"[1, 2]", Path::new("/repo")).unwrap_err();
        assert!(matches!(
            err,
            CoverageError::Malformed { format: CoverageFormat::StatementMap, .. }
        ));
    }
}
