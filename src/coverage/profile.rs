//! Line-profile decoder (`go test -coverprofile` output).

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::{is_blank, relative_path, CoverageError, CoverageFormat, CoverageParser, FileCoverage};

/// `path:startLine.startCol,endLine.endCol numStmt count`
fn block_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.+):(\d+)\.\d+,(\d+)\.\d+ (\d+) (\d+)$").expect("block pattern is valid")
    })
}

/// Longest block, in lines, the decoder accepts. Wider blocks are treated as malformed.
const MAX_BLOCK_SPAN: u32 = 100_000;

/// Decodes block profiles, one block per line after the `mode:` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineProfileParser;

#[derive(Default)]
struct Accumulator {
    total: u64,
    covered: u64,
    uncovered: BTreeSet<u32>,
}

impl CoverageParser for LineProfileParser {
    fn format(&self) -> CoverageFormat {
        CoverageFormat::LineProfile
    }

    fn parse(&self, raw: &[u8], repo_root: &Path) -> Result<Vec<FileCoverage>, CoverageError> {
        if is_blank(raw) {
            return Ok(Vec::new());
        }

        let text = String::from_utf8_lossy(raw);
        let mut order: Vec<String> = Vec::new();
        let mut files: HashMap<String, Accumulator> = HashMap::new();

        for line in text.lines() {
            let line = line.trim();
            if line.starts_with("mode:") {
                continue;
            }
            let Some(caps) = block_line().captures(line) else {
                continue;
            };
            let (Ok(start), Ok(end), Ok(stmts), Ok(count)) = (
                caps[2].parse::<u32>(),
                caps[3].parse::<u32>(),
                caps[4].parse::<u64>(),
                caps[5].parse::<u64>(),
            ) else {
                continue;
            };
            if end < start || end - start > MAX_BLOCK_SPAN {
                continue;
            }

            let path = relative_path(&caps[1], repo_root);
            let acc = files.entry(path.clone()).or_insert_with(|| {
                order.push(path);
                Accumulator::default()
            });
            acc.total = acc.total.saturating_add(stmts);
            if count > 0 {
                acc.covered = acc.covered.saturating_add(stmts);
            } else {
                acc.uncovered.extend(start..=end);
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|path| {
                let acc = files.remove(&path)?;
                let uncovered = acc.uncovered.into_iter().collect();
                Some(FileCoverage::new(path, acc.total, acc.covered, uncovered))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Vec<FileCoverage> {
        LineProfileParser.parse(raw.as_bytes(), Path::new("/repo")).unwrap()
    }

    #[test]
    fn aggregates_blocks_per_file() {
        let files = parse("mode: count\npkg/main.go:10.20,15.2 5 1\npkg/main.go:17.30,22.2 3 0\n");
        assert_eq!(files.len(), 1);
        let fc = &files[0];
        assert_eq!(fc.path, "pkg/main.go");
        assert_eq!(fc.total_lines, 8);
        assert_eq!(fc.covered_lines, 5);
        assert!((fc.percentage - 62.5).abs() < 1e-9);
        assert_eq!(fc.uncovered_lines, vec![17, 18, 19, 20, 21, 22]);
    }

    #[test]
    fn keeps_first_appearance_order() {
        let files = parse(
            "mode: set\n\
             b/b.go:1.1,2.2 1 1\n\
             a/a.go:1.1,2.2 1 0\n\
             b/b.go:4.1,5.2 1 0\n",
        );
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["b/b.go", "a/a.go"]);
        assert_eq!(files[0].uncovered_lines, vec![4, 5]);
    }

    #[test]
    fn overlapping_uncovered_blocks_are_deduplicated() {
        let files = parse("mode: count\nx.go:3.1,5.2 2 0\nx.go:5.3,6.2 1 0\n");
        assert_eq!(files[0].uncovered_lines, vec![3, 4, 5, 6]);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let files = parse("mode: count\nnot a block\nx.go:1.1,2.2 two 1\nx.go:1.1,2.2 2 1\n");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].total_lines, 2);
        assert_eq!(files[0].covered_lines, 2);
    }

    #[test]
    fn implausible_blocks_are_skipped() {
        let files = parse(
            "mode: count\n\
             x.go:1.1,4000000000.2 1 0\n\
             x.go:9.1,3.2 1 0\n\
             x.go:1.1,2.2 2 0\n",
        );
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].total_lines, 2);
        assert_eq!(files[0].uncovered_lines, vec![1, 2]);
    }

    #[test]
    fn huge_statement_counts_saturate() {
        let files = parse(
            "mode: count\n\
             x.go:1.1,2.2 18446744073709551615 1\n\
             x.go:3.1,4.2 5 1\n",
        );
        assert_eq!(files[0].total_lines, u64::MAX);
        assert_eq!(files[0].covered_lines, u64::MAX);
    }

    #[test]
    fn absolute_paths_are_made_relative() {
        let files = parse("mode: count\n/repo/internal/x.go:1.1,2.2 2 1\n");
        assert_eq!(files[0].path, "internal/x.go");
    }

    #[test]
    fn header_only_profile_is_empty() {
        assert!(parse("mode: atomic\n").is_empty());
    }
}
