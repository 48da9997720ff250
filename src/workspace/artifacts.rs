//! Named JSON documents stored under `<workspace>/artifacts/`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TargetKind, Workspace};
use crate::coverage::{percentage, CoverageReport};
use crate::ports::Clock;

/// Version written into every artifact.
pub const ARTIFACT_VERSION: &str = "1.0";

/// Seconds of generation budgeted per target when estimating a plan.
const SECONDS_PER_TARGET: u64 = 20;

/// Errors raised by the artifact store.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// No artifact with this name exists.
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// Reading, writing or listing failed.
    #[error("artifact I/O failed at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document could not be encoded or decoded.
    #[error("artifact {name} is not valid JSON: {source}")]
    Json {
        /// Artifact name.
        name: String,
        /// Codec error.
        #[source]
        source: serde_json::Error,
    },
}

/// The well-known artifact documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `test-plan.json`
    TestPlan,
    /// `execution.json`
    Execution,
    /// `coverage.json`
    Coverage,
    /// `mutation.json`
    Mutation,
    /// `summary.json`
    Summary,
}

impl ArtifactKind {
    /// Every kind, in pipeline order.
    pub const ALL: [Self; 5] =
        [Self::TestPlan, Self::Execution, Self::Coverage, Self::Mutation, Self::Summary];

    /// Base name without extension.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::TestPlan => "test-plan",
            Self::Execution => "execution",
            Self::Coverage => "coverage",
            Self::Mutation => "mutation",
            Self::Summary => "summary",
        }
    }

    /// File name on disk.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.json", self.name())
    }

    /// Looks a kind up by base name or file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let base = name.strip_suffix(".json").unwrap_or(name);
        Self::ALL.into_iter().find(|k| k.name() == base)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Plan of every discovered target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPlan {
    /// Document version.
    pub version: String,
    /// Repository URL.
    pub repository: String,
    /// Commit the plan was made at.
    pub commit_sha: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Totals.
    pub summary: TestPlanSummary,
    /// One entry per target.
    pub targets: Vec<PlanTarget>,
}

/// Totals of a [`TestPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlanSummary {
    /// Number of targets.
    pub total_targets: usize,
    /// Targets per kind.
    pub by_type: BTreeMap<String, usize>,
    /// Targets per file.
    pub by_file: BTreeMap<String, usize>,
    /// Rough generation time.
    pub estimated_time_minutes: u64,
}

/// One planned target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTarget {
    /// Target ID.
    pub id: String,
    /// Function name.
    pub name: String,
    /// Source file.
    pub file: String,
    /// First line.
    pub line: u32,
    /// Target kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Coarse complexity estimate.
    pub complexity: String,
    /// Suggested test levels.
    pub suggested_test_types: Vec<String>,
}

/// Outcome of running generated tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Document version.
    pub version: String,
    /// When the tests ran.
    pub executed_at: DateTime<Utc>,
    /// Wall-clock duration.
    pub duration_seconds: u64,
    /// Totals.
    pub summary: ExecutionSummary,
    /// Per-test results.
    pub tests: Vec<TestResult>,
}

/// Totals of an [`ExecutionReport`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Tests run.
    pub total: usize,
    /// Tests passed.
    pub passed: usize,
    /// Tests failed.
    pub failed: usize,
    /// Tests skipped.
    pub skipped: usize,
    /// `passed / total * 100`.
    pub pass_rate: f64,
}

impl ExecutionSummary {
    /// Totals for `results`.
    #[must_use]
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut summary = Self { total: results.len(), ..Self::default() };
        for r in results {
            match r.status {
                TestOutcome::Passed => summary.passed += 1,
                TestOutcome::Failed => summary.failed += 1,
                TestOutcome::Skipped => summary.skipped += 1,
            }
        }
        summary.pass_rate = percentage(summary.passed as u64, summary.total as u64);
        summary
    }
}

/// Result status of one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    /// Test passed.
    Passed,
    /// Test failed.
    Failed,
    /// Test was not run.
    Skipped,
}

/// One executed test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test ID.
    pub id: String,
    /// Test name.
    pub name: String,
    /// Test file.
    pub file: String,
    /// Target the test covers.
    pub target: String,
    /// Outcome.
    pub status: TestOutcome,
    /// Duration in milliseconds.
    pub duration_ms: u64,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mutation-testing results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationReport {
    /// Document version.
    pub version: String,
    /// When mutation testing ran.
    pub executed_at: DateTime<Utc>,
    /// Wall-clock duration.
    pub duration_seconds: u64,
    /// Totals.
    pub summary: MutationSummary,
    /// Per-test scores.
    pub by_test: Vec<TestMutations>,
    /// Mutants no test killed.
    pub survivors: Vec<SurvivedMutant>,
}

/// Results handed over by an external mutation-testing tool.
///
/// Scores are derived from the counts when the report is written.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MutationResults {
    /// Totals; only the counts are used.
    pub summary: MutationSummary,
    /// Per-test counts.
    pub by_test: Vec<TestMutations>,
    /// Mutants no test killed.
    pub survivors: Vec<SurvivedMutant>,
    /// Wall-clock duration of the tool run.
    pub duration_seconds: u64,
}

/// Totals of a [`MutationReport`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationSummary {
    /// Mutants generated.
    pub total_mutants: usize,
    /// Mutants detected by a test.
    pub killed: usize,
    /// Mutants no test detected.
    pub survived: usize,
    /// Mutants that timed out.
    #[serde(default)]
    pub timeout: usize,
    /// `killed / total * 100`.
    #[serde(default)]
    pub mutation_score: f64,
}

impl MutationSummary {
    /// Builds a summary, deriving the score from the counts.
    #[must_use]
    pub fn new(total_mutants: usize, killed: usize, survived: usize, timeout: usize) -> Self {
        Self {
            total_mutants,
            killed,
            survived,
            timeout,
            mutation_score: percentage(killed as u64, total_mutants as u64),
        }
    }
}

/// Mutation score of one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMutations {
    /// Test ID.
    pub test_id: String,
    /// Mutants run against the test.
    pub mutants_tested: usize,
    /// Mutants it killed.
    pub killed: usize,
    /// `killed / mutants_tested * 100`.
    #[serde(default)]
    pub score: f64,
}

/// A mutant that survived the suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurvivedMutant {
    /// Mutant ID.
    pub id: String,
    /// Mutation operator.
    pub operator: String,
    /// `file:line`.
    pub location: String,
    /// Original code.
    pub original: String,
    /// Mutated code.
    pub mutated: String,
    /// Test expected to catch it.
    pub test_that_should_catch: String,
}

/// Which driver produced a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Sequential per-target generation.
    Sequential,
    /// Coverage-guided iteration.
    CoverageGuided,
}

/// Final report of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Document version.
    pub version: String,
    /// Workspace ID.
    pub workspace_id: String,
    /// Repository URL.
    pub repository: String,
    /// Branch tests were written to.
    pub branch: String,
    /// Commit targets were discovered at.
    pub commit_sha: String,
    /// Driver that produced the run.
    pub mode: RunMode,
    /// Run start.
    pub started_at: DateTime<Utc>,
    /// Run end.
    pub completed_at: DateTime<Utc>,
    /// Wall-clock duration.
    pub duration_seconds: i64,
    /// Counts.
    pub results: GenerationResults,
    /// Coverage measured at the end of a coverage-guided run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_coverage: Option<f64>,
    /// Artifact files present when the summary was written.
    pub artifacts: Vec<String>,
}

/// Counts in a [`GenerationSummary`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResults {
    /// Targets known.
    pub total_targets: usize,
    /// Targets completed.
    pub completed: usize,
    /// Targets failed.
    pub failed: usize,
    /// Targets skipped.
    pub skipped: usize,
    /// Targets with a test file.
    pub tests_written: usize,
    /// Targets with a commit.
    pub commits: usize,
}

/// Reads and writes artifacts for one workspace.
pub struct ArtifactManager<'a> {
    dir: PathBuf,
    clock: &'a dyn Clock,
}

impl<'a> ArtifactManager<'a> {
    /// Manages artifacts in `dir`.
    pub fn new(dir: impl Into<PathBuf>, clock: &'a dyn Clock) -> Self {
        Self { dir: dir.into(), clock }
    }

    /// Manages the artifacts of `workspace`.
    #[must_use]
    pub fn for_workspace(workspace: &Workspace, clock: &'a dyn Clock) -> Self {
        Self::new(workspace.artifacts_dir(), clock)
    }

    /// Artifact directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `value` as pretty JSON to `<name>.json` atomically.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] if encoding or writing fails.
    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, ArtifactError> {
        fs::create_dir_all(&self.dir)
            .map_err(|source| ArtifactError::Io { path: self.dir.clone(), source })?;
        let data = serde_json::to_vec_pretty(value)
            .map_err(|source| ArtifactError::Json { name: name.to_string(), source })?;

        let path = self.path(name);
        let tmp = self.dir.join(format!(".{}.tmp", file_name(name)));
        fs::write(&tmp, data).map_err(|source| ArtifactError::Io { path: tmp.clone(), source })?;
        fs::rename(&tmp, &path).map_err(|source| ArtifactError::Io { path: path.clone(), source })?;
        debug!(artifact = name, path = %path.display(), "saved artifact");
        Ok(path)
    }

    /// Reads `<name>.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::NotFound`] if it does not exist, or another
    /// [`ArtifactError`] if it cannot be read or decoded.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArtifactError> {
        let path = self.path(name);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(name.to_string()));
            }
            Err(source) => return Err(ArtifactError::Io { path, source }),
        };
        serde_json::from_slice(&raw)
            .map_err(|source| ArtifactError::Json { name: name.to_string(), source })
    }

    /// Artifact file names, sorted. A missing directory lists as empty.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();
        names
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(file_name(name))
    }

    /// Writes the test plan for every target in `workspace`.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] if the plan cannot be saved.
    pub fn write_test_plan(&self, workspace: &Workspace) -> Result<TestPlan, ArtifactError> {
        let meta = workspace.meta();
        let state = workspace.snapshot();

        let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_file: BTreeMap<String, usize> = BTreeMap::new();
        let targets = state
            .targets
            .values()
            .map(|t| {
                *by_type.entry(t.kind.as_str().to_string()).or_default() += 1;
                *by_file.entry(t.file.clone()).or_default() += 1;
                PlanTarget {
                    id: t.id.clone(),
                    name: t.name.clone(),
                    file: t.file.clone(),
                    line: t.line,
                    kind: t.kind.as_str().to_string(),
                    complexity: if t.kind == TargetKind::Method { "medium" } else { "low" }
                        .to_string(),
                    suggested_test_types: vec!["unit".to_string()],
                }
            })
            .collect();

        let plan = TestPlan {
            version: ARTIFACT_VERSION.to_string(),
            repository: meta.repo_url,
            commit_sha: meta.commit_sha,
            created_at: self.clock.now(),
            summary: TestPlanSummary {
                total_targets: state.total_targets,
                by_type,
                by_file,
                estimated_time_minutes: estimate_minutes(state.total_targets),
            },
            targets,
        };
        self.save(ArtifactKind::TestPlan.name(), &plan)?;
        Ok(plan)
    }

    /// Writes the execution report for `results`.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] if the report cannot be saved.
    pub fn write_execution(
        &self,
        results: Vec<TestResult>,
        duration: Duration,
    ) -> Result<ExecutionReport, ArtifactError> {
        let report = ExecutionReport {
            version: ARTIFACT_VERSION.to_string(),
            executed_at: self.clock.now(),
            duration_seconds: duration.as_secs(),
            summary: ExecutionSummary::from_results(&results),
            tests: results,
        };
        self.save(ArtifactKind::Execution.name(), &report)?;
        Ok(report)
    }

    /// Writes a coverage report.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] if the report cannot be saved.
    pub fn write_coverage(&self, report: &CoverageReport) -> Result<PathBuf, ArtifactError> {
        self.save(ArtifactKind::Coverage.name(), report)
    }

    /// Writes a mutation report.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] if the report cannot be saved.
    pub fn write_mutation(
        &self,
        summary: MutationSummary,
        by_test: Vec<TestMutations>,
        survivors: Vec<SurvivedMutant>,
        duration: Duration,
    ) -> Result<MutationReport, ArtifactError> {
        let summary = MutationSummary::new(
            summary.total_mutants,
            summary.killed,
            summary.survived,
            summary.timeout,
        );
        let by_test = by_test
            .into_iter()
            .map(|t| TestMutations {
                score: percentage(t.killed as u64, t.mutants_tested as u64),
                ..t
            })
            .collect();
        let report = MutationReport {
            version: ARTIFACT_VERSION.to_string(),
            executed_at: self.clock.now(),
            duration_seconds: duration.as_secs(),
            summary,
            by_test,
            survivors,
        };
        self.save(ArtifactKind::Mutation.name(), &report)?;
        Ok(report)
    }

    /// Writes the final summary of a run that began at `started_at`.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] if the summary cannot be saved.
    pub fn write_summary(
        &self,
        workspace: &Workspace,
        started_at: DateTime<Utc>,
        mode: RunMode,
        final_coverage: Option<f64>,
    ) -> Result<GenerationSummary, ArtifactError> {
        let meta = workspace.meta();
        let state = workspace.snapshot();
        let completed_at = self.clock.now();

        let mut artifacts = self.list();
        let own = ArtifactKind::Summary.file_name();
        if !artifacts.contains(&own) {
            artifacts.push(own);
            artifacts.sort();
        }

        let summary = GenerationSummary {
            version: ARTIFACT_VERSION.to_string(),
            workspace_id: meta.id,
            repository: meta.repo_url,
            branch: meta.branch,
            commit_sha: meta.commit_sha,
            mode,
            started_at,
            completed_at,
            duration_seconds: (completed_at - started_at).num_seconds().max(0),
            results: GenerationResults {
                total_targets: state.total_targets,
                completed: state.completed,
                failed: state.failed,
                skipped: state.skipped,
                tests_written: state.tests_written(),
                commits: state.commits(),
            },
            final_coverage,
            artifacts,
        };
        self.save(ArtifactKind::Summary.name(), &summary)?;
        Ok(summary)
    }
}

/// Rough generation time for `targets` targets, in whole minutes.
#[must_use]
pub fn estimate_minutes(targets: usize) -> u64 {
    targets as u64 * SECONDS_PER_TARGET / 60
}

fn file_name(name: &str) -> String {
    if Path::new(name).extension().is_some_and(|e| e == "json") {
        name.to_string()
    } else {
        format!("{name}.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::test_context;
    use crate::model::Language;
    use crate::workspace::tests::function;
    use crate::workspace::{TargetUpdate, WorkspaceConfig};

    #[test]
    fn thirty_targets_estimate_ten_minutes() {
        assert_eq!(estimate_minutes(30), 10);
        assert_eq!(estimate_minutes(2), 0);
        assert_eq!(estimate_minutes(0), 0);
    }

    #[test]
    fn save_load_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context();
        let am = ArtifactManager::new(dir.path().join("artifacts"), ctx.clock.as_ref());

        assert!(am.list().is_empty());
        am.save("notes", &serde_json::json!({"a": 1})).unwrap();
        am.save("b.json", &vec![1, 2, 3]).unwrap();

        let loaded: serde_json::Value = am.load("notes").unwrap();
        assert_eq!(loaded["a"], 1);
        let loaded: Vec<u32> = am.load("b.json").unwrap();
        assert_eq!(loaded, [1, 2, 3]);
        assert_eq!(am.list(), ["b.json", "notes.json"]);
    }

    #[test]
    fn missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context();
        let am = ArtifactManager::new(dir.path(), ctx.clock.as_ref());

        let err = am.load::<TestPlan>("test-plan").unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(name) if name == "test-plan"));

        fs::write(dir.path().join("summary.json"), "{").unwrap();
        let err = am.load::<GenerationSummary>("summary").unwrap_err();
        assert!(matches!(err, ArtifactError::Json { .. }));
    }

    #[test]
    fn test_plan_counts_targets() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context();
        let config = WorkspaceConfig::new(dir.path());
        let ws = Workspace::create("demo", "https://example.com/r.git", None, &config, &ctx)
            .unwrap();
        let funcs: Vec<_> = (1..=30).map(|i| function(&format!("F{i:02}"), i, true)).collect();
        ws.add_targets(&funcs[..20], "a.go");
        ws.add_targets(&funcs[20..], "b.go");

        let am = ArtifactManager::for_workspace(&ws, ctx.clock.as_ref());
        let plan = am.write_test_plan(&ws).unwrap();
        assert_eq!(plan.summary.total_targets, 30);
        assert_eq!(plan.summary.estimated_time_minutes, 10);
        assert_eq!(plan.summary.by_file["a.go"], 20);
        assert_eq!(plan.summary.by_type["function"], 30);

        let reloaded: TestPlan = am.load("test-plan").unwrap();
        assert_eq!(reloaded, plan);
    }

    #[test]
    fn execution_report_computes_pass_rate() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context();
        let am = ArtifactManager::new(dir.path(), ctx.clock.as_ref());
        let result = |id: &str, status| TestResult {
            id: id.into(),
            name: id.into(),
            file: "t.py".into(),
            target: "f".into(),
            status,
            duration_ms: 5,
            error: None,
        };

        let report = am
            .write_execution(
                vec![
                    result("a", TestOutcome::Passed),
                    result("b", TestOutcome::Passed),
                    result("c", TestOutcome::Passed),
                    result("d", TestOutcome::Failed),
                ],
                Duration::from_secs(7),
            )
            .unwrap();
        assert_eq!(report.summary.passed, 3);
        assert!((report.summary.pass_rate - 75.0).abs() < 1e-9);
        assert_eq!(report.duration_seconds, 7);
    }

    #[test]
    fn mutation_score_is_derived() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context();
        let am = ArtifactManager::new(dir.path(), ctx.clock.as_ref());
        let bogus = MutationSummary { mutation_score: 99.0, ..MutationSummary::new(10, 7, 2, 1) };

        let report = am.write_mutation(bogus, Vec::new(), Vec::new(), Duration::ZERO).unwrap();
        assert!((report.summary.mutation_score - 70.0).abs() < 1e-9);
    }

    #[test]
    fn summary_reports_counts_and_lists_itself() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context();
        let config = WorkspaceConfig::new(dir.path());
        let ws = Workspace::create("demo", "u", None, &config, &ctx).unwrap();
        ws.add_targets(&[function("A", 1, true), function("B", 2, true)], "m.py");
        ws.update_target("m.py:1:A", TargetUpdate::completed(Some("tests/m_test.py".into())))
            .unwrap();
        ws.update_target("m.py:2:B", TargetUpdate::failed("bad reply")).unwrap();
        let started = ws.mark_started();

        let am = ArtifactManager::for_workspace(&ws, ctx.clock.as_ref());
        am.write_coverage(&CoverageReport::empty(Language::Python, ctx.clock.now())).unwrap();
        let summary = am.write_summary(&ws, started, RunMode::Sequential, None).unwrap();

        assert_eq!(summary.results.completed, 1);
        assert_eq!(summary.results.failed, 1);
        assert_eq!(summary.results.tests_written, 1);
        assert_eq!(summary.artifacts, ["coverage.json", "summary.json"]);
        assert!(summary.duration_seconds >= 0);
        assert!(am.list().iter().all(|n| !n.ends_with(".tmp")));
    }

    #[test]
    fn kinds_resolve_from_names() {
        assert_eq!(ArtifactKind::from_name("coverage"), Some(ArtifactKind::Coverage));
        assert_eq!(ArtifactKind::from_name("test-plan.json"), Some(ArtifactKind::TestPlan));
        assert_eq!(ArtifactKind::from_name("other"), None);
    }
}
