//! Ranks uncovered regions of a coverage report and turns them into intents.

use crate::coverage::{CoverageReport, FileCoverage};
use crate::model::{CoverageGap, GapKind, Priority, TestIntent, TestLevel};
use crate::ports::GapAnalyzer;

/// Runs shorter than this many lines are not worth a dedicated test.
const MIN_BLOCK_LINES: u32 = 4;

/// Groups contiguous uncovered lines into block gaps.
///
/// Files that report missed units but no line numbers (statement maps
/// without locations) become a single file-level gap instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockGapAnalyzer;

impl GapAnalyzer for BlockGapAnalyzer {
    fn analyze(&self, report: &CoverageReport, target_coverage: f64) -> Vec<CoverageGap> {
        let mut gaps: Vec<CoverageGap> = report
            .files
            .iter()
            .filter(|f| f.percentage < target_coverage)
            .flat_map(file_gaps)
            .collect();
        gaps.sort_by(|a, b| b.priority.cmp(&a.priority));
        gaps
    }
}

fn file_gaps(file: &FileCoverage) -> Vec<CoverageGap> {
    if file.uncovered_lines.is_empty() {
        if file.missed() == 0 {
            return Vec::new();
        }
        let priority = if file.percentage < 50.0 { Priority::High } else { Priority::Medium };
        return vec![CoverageGap {
            file: file.path.clone(),
            start_line: 1,
            end_line: 1,
            kind: GapKind::File,
            name: file.path.clone(),
            priority,
            reason: format!(
                "{} of {} statements not covered ({:.1}%)",
                file.missed(),
                file.total_lines,
                file.percentage
            ),
        }];
    }

    let mut lines = file.uncovered_lines.clone();
    lines.sort_unstable();
    lines.dedup();

    let mut gaps = Vec::new();
    let mut start = lines[0];
    let mut end = lines[0];
    for &line in &lines[1..] {
        if line == end + 1 {
            end = line;
        } else {
            push_block(&mut gaps, &file.path, start, end);
            start = line;
            end = line;
        }
    }
    push_block(&mut gaps, &file.path, start, end);
    gaps
}

fn push_block(gaps: &mut Vec<CoverageGap>, path: &str, start: u32, end: u32) {
    let span = end - start;
    if span + 1 < MIN_BLOCK_LINES {
        return;
    }
    let priority = if span > 20 {
        Priority::High
    } else if span > 10 {
        Priority::Medium
    } else {
        Priority::Low
    };
    gaps.push(CoverageGap {
        file: path.to_string(),
        start_line: start,
        end_line: end,
        kind: GapKind::Block,
        name: String::new(),
        priority,
        reason: "Code block not covered by tests".to_string(),
    });
}

/// Derives one unit-level intent per gap, keeping the gap order.
#[must_use]
pub fn intents_from_gaps(gaps: &[CoverageGap]) -> Vec<TestIntent> {
    gaps.iter()
        .map(|gap| TestIntent {
            id: format!("cov:{}:{}", gap.file, gap.start_line),
            level: TestLevel::Unit,
            target_kind: gap.kind.as_str().to_string(),
            target_id: gap.target_id(),
            priority: gap.priority,
            reason: if gap.name.is_empty() {
                gap.reason.clone()
            } else {
                format!("{} ({})", gap.reason, gap.name)
            },
            source: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Language;

    fn report(files: Vec<FileCoverage>) -> CoverageReport {
        CoverageReport::from_files(files, Language::Go, "test", chrono::Utc::now())
    }

    #[test]
    fn groups_contiguous_runs_of_four_or_more() {
        let mut lines: Vec<u32> = (10..=13).collect();
        lines.extend([20, 21, 22]);
        lines.extend(40..=70);
        let r = report(vec![FileCoverage::new("a.go", 100, 60, lines)]);

        let gaps = BlockGapAnalyzer.analyze(&r, 80.0);
        assert_eq!(gaps.len(), 2);
        let spans: Vec<_> = gaps.iter().map(|g| (g.start_line, g.end_line, g.priority)).collect();
        assert_eq!(spans, [(40, 70, Priority::High), (10, 13, Priority::Low)]);
    }

    #[test]
    fn block_priority_follows_span() {
        let r = report(vec![FileCoverage::new("b.go", 100, 10, (1..=12).collect())]);
        let gaps = BlockGapAnalyzer.analyze(&r, 80.0);
        assert_eq!(gaps[0].priority, Priority::Medium);

        let r = report(vec![FileCoverage::new("b.go", 100, 10, (1..=11).collect())]);
        let gaps = BlockGapAnalyzer.analyze(&r, 80.0);
        assert_eq!(gaps[0].priority, Priority::Low);
    }

    #[test]
    fn files_at_target_contribute_nothing() {
        let r = report(vec![FileCoverage::new("done.go", 10, 9, (1..=5).collect())]);
        assert!(BlockGapAnalyzer.analyze(&r, 80.0).is_empty());
    }

    #[test]
    fn files_without_line_detail_become_file_gaps() {
        let r = report(vec![
            FileCoverage::new("low.js", 10, 2, vec![]),
            FileCoverage::new("mid.js", 10, 6, vec![]),
        ]);
        let gaps = BlockGapAnalyzer.analyze(&r, 80.0);
        assert_eq!(gaps.len(), 2);
        assert_eq!(
            (gaps[0].file.as_str(), gaps[0].kind, gaps[0].priority),
            ("low.js", GapKind::File, Priority::High)
        );
        assert_eq!((gaps[1].file.as_str(), gaps[1].priority), ("mid.js", Priority::Medium));
    }

    #[test]
    fn intents_carry_gap_identity() {
        let r = report(vec![FileCoverage::new("pkg/x.go", 50, 10, (5..=9).collect())]);
        let gaps = BlockGapAnalyzer.analyze(&r, 80.0);
        let intents = intents_from_gaps(&gaps);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].id, "cov:pkg/x.go:5");
        assert_eq!(intents[0].target_kind, "block");
        assert_eq!(intents[0].target_id, "pkg/x.go:5:block");
        assert_eq!(intents[0].level, TestLevel::Unit);
    }
}
