//! Gap-analysis port: ranks uncovered regions of a coverage report.

use crate::coverage::CoverageReport;
use crate::model::CoverageGap;

/// Finds and ranks coverage gaps.
pub trait GapAnalyzer: Send + Sync {
    /// Returns gaps in `report`, highest priority first.
    ///
    /// Files already at or above `target_coverage` contribute no gaps.
    fn analyze(&self, report: &CoverageReport, target_coverage: f64) -> Vec<CoverageGap>;
}
