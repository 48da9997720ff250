//! Closed-loop driver: measure coverage, generate tests for the worst gaps, repeat.
//!
//! Each round collects coverage, stops once the target is met or no gaps
//! remain, and otherwise generates one spec per top-ranked gap. Specs from a
//! round are rendered together and appended to a single test file, then
//! coverage is measured again to feed the next round.
//!
//! The first round is a [`RoundKind::Bootstrap`] round: a repository whose
//! suite cannot be measured yet starts from an empty report instead of
//! aborting. Later rounds skip themselves when collection fails.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::artifacts::{ArtifactManager, RunMode};
use super::gaps::intents_from_gaps;
use super::runner::{extract_lines, write_or_append, RunError};
use super::{TargetUpdate, Workspace};
use crate::cancel::CancelToken;
use crate::config::ProjectConfig;
use crate::context::ServiceContext;
use crate::coverage::collector::{CoverageCollector, CoverageCommand};
use crate::coverage::{CoverageError, CoverageReport};
use crate::model::{CoverageGap, GapKind, Language, SystemModel, TestIntent, TestSpec};
use crate::ports::Tier;

/// Base name of the file coverage-driven tests are appended to.
pub const OUTPUT_STEM: &str = "coverage_generated";

/// Settings for a coverage-guided run.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRunConfig {
    /// Model tier; `None` defers to `.qtest.yaml`, then [`Tier::Balanced`].
    pub tier: Option<Tier>,
    /// Language override; `None` keeps the workspace's, then `.qtest.yaml`'s,
    /// then detects it from build files.
    pub language: Option<Language>,
    /// Stop once aggregate coverage reaches this percentage.
    pub target_coverage: f64,
    /// Upper bound on rounds.
    pub max_iterations: usize,
    /// Upper bound on specs per round.
    pub max_tests_per_run: usize,
    /// Directory (relative to the repo) receiving the generated test file.
    pub test_dir: String,
    /// Re-measure coverage after each round.
    pub run_tests: bool,
    /// Commit the test file after each round.
    pub commit_each: bool,
    /// Order each round's intents by gap priority.
    pub focus_critical: bool,
    /// Generate specs but write and commit nothing.
    pub dry_run: bool,
}

impl Default for CoverageRunConfig {
    fn default() -> Self {
        Self {
            tier: None,
            language: None,
            target_coverage: 80.0,
            max_iterations: 5,
            max_tests_per_run: 10,
            test_dir: "tests".to_string(),
            run_tests: true,
            commit_each: false,
            focus_critical: true,
            dry_run: false,
        }
    }
}

/// Whether a round may fall back to an empty report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    /// First round; collection failure means "no coverage yet".
    Bootstrap,
    /// Any later round; collection failure skips the round.
    SteadyState,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Aggregate coverage met the target.
    TargetReached,
    /// The analyzer found nothing left to cover.
    NoGaps,
    /// `max_iterations` rounds were used.
    BudgetExhausted,
    /// Cancelled at a round boundary; the workspace is paused.
    Cancelled,
}

/// What one generation round did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    /// 1-based round number.
    pub iteration: usize,
    /// Bootstrap or steady state.
    pub kind: RoundKind,
    /// Coverage the round started from.
    pub coverage_before: f64,
    /// Coverage measured after the round, if it was re-measured.
    pub coverage_after: Option<f64>,
    /// Gaps reported by the analyzer.
    pub gaps: usize,
    /// Intents attempted.
    pub intents: usize,
    /// Specs successfully generated.
    pub specs: usize,
    /// Test file written, relative to the repository.
    pub test_file: Option<String>,
}

/// Result of [`CoverageRunner::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageOutcome {
    /// Generation rounds performed.
    pub rounds: Vec<RoundRecord>,
    /// Why the loop ended.
    pub stop_reason: StopReason,
    /// Coverage of the first measured report.
    pub initial_coverage: f64,
    /// Last known coverage.
    pub final_coverage: f64,
    /// Specs generated across all rounds.
    pub specs_generated: usize,
}

/// Stable sort, most urgent first; equal priorities keep their order.
pub fn sort_intents_by_priority(intents: &mut [TestIntent]) {
    intents.sort_by(|a, b| b.priority.cmp(&a.priority));
}

/// Coverage-guided generation over a workspace.
pub struct CoverageRunner<'a> {
    workspace: &'a Workspace,
    ctx: &'a ServiceContext,
    config: CoverageRunConfig,
}

impl<'a> CoverageRunner<'a> {
    /// Creates a runner over `workspace`.
    #[must_use]
    pub fn new(
        workspace: &'a Workspace,
        ctx: &'a ServiceContext,
        config: CoverageRunConfig,
    ) -> Self {
        Self { workspace, ctx, config }
    }

    fn collector(&self) -> CoverageCollector<'_> {
        CoverageCollector::new(
            self.ctx.shell.as_ref(),
            self.ctx.clock.as_ref(),
            self.workspace.scratch_dir(),
        )
    }

    fn artifacts(&self) -> ArtifactManager<'_> {
        ArtifactManager::for_workspace(self.workspace, self.ctx.clock.as_ref())
    }

    fn collect(&self) -> Result<CoverageReport, CoverageError> {
        let report = self
            .collector()
            .collect(&self.workspace.repo_path(), self.workspace.language())?;
        if let Err(e) = self.artifacts().write_coverage(&report) {
            warn!(error = %e, "failed to write coverage artifact");
        }
        Ok(report)
    }

    fn resolve_language(&self, repo: &Path, project: &ProjectConfig) -> Language {
        let current = self.workspace.language();
        let language = self
            .config
            .language
            .or_else(|| current.is_known().then_some(current))
            .or_else(|| project.language())
            .unwrap_or_else(|| Language::detect_project(repo));
        if language != current {
            info!(%language, "using workspace language");
            self.workspace.set_language(language);
        }
        language
    }

    /// Runs up to `max_iterations` rounds.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] if the repository is missing, no coverage tool
    /// fits its language, or workspace state cannot be saved at the end of
    /// the run. Collection, generation and artifact failures are logged and
    /// contained within their round.
    pub async fn run(&mut self, cancel: &CancelToken) -> Result<CoverageOutcome, RunError> {
        let repo = self.workspace.repo_path();
        if !repo.is_dir() {
            return Err(RunError::RepoMissing(repo));
        }
        let project = ProjectConfig::load(&repo).unwrap_or_else(|e| {
            warn!(error = %e, "failed to load project config, using defaults");
            ProjectConfig::default()
        });
        if self.config.tier.is_none() {
            self.config.tier = project.tier();
        }

        let language = self.resolve_language(&repo, &project);
        let scratch = self.workspace.scratch_dir();
        if let Err(e) = CoverageCommand::for_language(language, &repo, &scratch) {
            error!(%language, error = %e, "cannot measure coverage for this workspace");
            return Err(RunError::CoverageUnavailable(e));
        }

        let started_at = self.workspace.mark_started();
        if let Err(e) = self.workspace.save() {
            warn!(error = %e, "failed to save workspace state");
        }
        info!(
            workspace = %self.workspace.id(),
            target = self.config.target_coverage,
            max_iterations = self.config.max_iterations,
            "starting coverage-guided generation"
        );

        let mut outcome = CoverageOutcome {
            rounds: Vec::new(),
            stop_reason: StopReason::BudgetExhausted,
            initial_coverage: 0.0,
            final_coverage: 0.0,
            specs_generated: 0,
        };
        let mut measured = false;
        let mut carried: Option<CoverageReport> = None;
        let mut kind = RoundKind::Bootstrap;

        for iteration in 1..=self.config.max_iterations {
            if cancel.is_cancelled() {
                info!(iteration, "pausing coverage run");
                self.workspace.mark_paused();
                self.workspace.save()?;
                outcome.stop_reason = StopReason::Cancelled;
                return Ok(outcome);
            }

            let round_kind = kind;
            kind = RoundKind::SteadyState;
            let report = match carried.take() {
                Some(report) => report,
                None => match (self.collect(), round_kind) {
                    (Ok(report), _) => report,
                    (Err(e), RoundKind::Bootstrap) => {
                        warn!(
                            error = %e,
                            "initial coverage unavailable, starting from empty report"
                        );
                        CoverageReport::empty(self.workspace.language(), self.ctx.clock.now())
                    }
                    (Err(e), RoundKind::SteadyState) => {
                        warn!(iteration, error = %e, "coverage collection failed, skipping round");
                        continue;
                    }
                },
            };

            let coverage = report.percentage();
            if !measured {
                outcome.initial_coverage = coverage;
                measured = true;
            }
            outcome.final_coverage = coverage;
            info!(iteration, coverage = %format!("{coverage:.1}%"), "coverage measured");

            if coverage >= self.config.target_coverage {
                info!(coverage, target = self.config.target_coverage, "target coverage reached");
                outcome.stop_reason = StopReason::TargetReached;
                break;
            }

            let gaps = self.ctx.analyzer.analyze(&report, self.config.target_coverage);
            if gaps.is_empty() {
                info!("no coverage gaps left to address");
                outcome.stop_reason = StopReason::NoGaps;
                break;
            }

            let mut record = self.round(iteration, round_kind, coverage, &gaps).await;
            outcome.specs_generated += record.specs;

            if self.config.run_tests && !self.config.dry_run && record.specs > 0 {
                match self.collect() {
                    Ok(after) => {
                        record.coverage_after = Some(after.percentage());
                        outcome.final_coverage = after.percentage();
                        self.mark_covered(&gaps, &after);
                        carried = Some(after);
                    }
                    Err(e) => warn!(iteration, error = %e, "coverage re-measurement failed"),
                }
            }
            outcome.rounds.push(record);

            if let Err(e) = self.workspace.save() {
                warn!(error = %e, "failed to save workspace state");
            }
        }

        self.workspace.set_phase(super::Phase::Completed);
        let final_coverage = Some(outcome.final_coverage);
        if let Err(e) = self.artifacts().write_summary(
            self.workspace,
            started_at,
            RunMode::CoverageGuided,
            final_coverage,
        ) {
            warn!(error = %e, "failed to write summary artifact");
        }
        self.workspace.save()?;
        info!(
            rounds = outcome.rounds.len(),
            specs = outcome.specs_generated,
            stop = ?outcome.stop_reason,
            "coverage-guided generation finished"
        );
        Ok(outcome)
    }

    async fn round(
        &self,
        iteration: usize,
        kind: RoundKind,
        coverage: f64,
        gaps: &[CoverageGap],
    ) -> RoundRecord {
        let mut intents = intents_from_gaps(gaps);
        intents.truncate(self.config.max_tests_per_run);
        if self.config.focus_critical {
            sort_intents_by_priority(&mut intents);
        }
        info!(iteration, gaps = gaps.len(), intents = intents.len(), "generating tests for gaps");

        let repo = self.workspace.repo_path();
        let meta = self.workspace.meta();
        let model = SystemModel {
            id: meta.id,
            repository: meta.repo_url,
            language: meta.language,
            functions: Vec::new(),
        };
        let tier = self.config.tier.unwrap_or_default();

        let mut specs: Vec<TestSpec> = Vec::new();
        let mut targets: Vec<String> = Vec::new();
        for mut intent in intents.iter().cloned() {
            let Some(gap) = gaps.iter().find(|g| g.target_id() == intent.target_id) else {
                continue;
            };
            intent.source = gap_source(&repo, gap);

            let spec = match self.ctx.specgen.generate(&intent, &model, tier).await {
                Ok(spec) => spec,
                Err(e) => {
                    warn!(
                        intent = %intent.id,
                        error = %e,
                        "spec generation failed, dropping intent"
                    );
                    continue;
                }
            };

            let target_id = self.workspace.add_gap_target(gap);
            match serde_json::to_value(&spec) {
                Ok(value) => {
                    if let Err(e) =
                        self.workspace.mark_spec_generated(&target_id, &spec.id, value)
                    {
                        warn!(target = %target_id, error = %e, "failed to store spec");
                    }
                }
                Err(e) => warn!(target = %target_id, error = %e, "failed to encode spec"),
            }
            targets.push(target_id);
            specs.push(spec);
        }

        let mut record = RoundRecord {
            iteration,
            kind,
            coverage_before: coverage,
            coverage_after: None,
            gaps: gaps.len(),
            intents: intents.len(),
            specs: specs.len(),
            test_file: None,
        };
        if specs.is_empty() {
            return record;
        }

        let test_file = if self.config.dry_run {
            None
        } else {
            match self.write_tests(&repo, iteration, &specs) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(iteration, error = %e, "failed to write coverage tests");
                    self.finish_targets(&targets, || TargetUpdate::failed(e.clone()));
                    return record;
                }
            }
        };
        self.finish_targets(&targets, || TargetUpdate::completed(test_file.clone()));

        if let Some(file) = test_file.as_deref().filter(|_| self.config.commit_each) {
            let message = format!("test: add coverage-guided tests (round {iteration})");
            match self.ctx.git.commit(&repo, Path::new(file), &message) {
                Ok(sha) => {
                    for id in &targets {
                        if let Err(e) = self.workspace.set_commit(id, &sha) {
                            debug!(target = %id, error = %e, "failed to record commit");
                        }
                    }
                }
                Err(e) => warn!(error = %e, "failed to commit coverage tests"),
            }
        }
        record.test_file = test_file;
        record
    }

    /// Renders `specs` and appends them to the round's test file.
    fn write_tests(
        &self,
        repo: &Path,
        iteration: usize,
        specs: &[TestSpec],
    ) -> Result<String, String> {
        let emitted = self
            .ctx
            .emitter
            .emit(specs)
            .map_err(|e| format!("code emission failed: {e}"))?;
        let relative =
            Path::new(&self.config.test_dir).join(format!("{OUTPUT_STEM}{}", emitted.extension));
        let path: PathBuf = repo.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
        }

        let label = format!("coverage round {iteration}");
        write_or_append(&path, self.ctx.emitter.as_ref(), &label, &emitted.source)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        info!(
            file = %relative.display(),
            specs = specs.len(),
            emitter = self.ctx.emitter.name(),
            "wrote coverage tests"
        );
        Ok(relative.to_string_lossy().into_owned())
    }

    fn finish_targets(&self, targets: &[String], update: impl Fn() -> TargetUpdate) {
        for id in targets {
            if let Err(e) = self.workspace.update_target(id, update()) {
                debug!(target = %id, error = %e, "target already finished");
            }
        }
    }

    fn mark_covered(&self, gaps: &[CoverageGap], after: &CoverageReport) {
        for gap in gaps {
            let covered = match after.file(&gap.file) {
                Some(file) if gap.kind == GapKind::File => file.missed() == 0,
                Some(file) => !file
                    .uncovered_lines
                    .iter()
                    .any(|l| (gap.start_line..=gap.end_line).contains(l)),
                None => false,
            };
            if covered && self.workspace.target(&gap.target_id()).is_some() {
                if let Err(e) = self.workspace.mark_covered(&gap.target_id()) {
                    debug!(error = %e, "failed to mark gap covered");
                }
            }
        }
    }
}

fn gap_source(repo: &Path, gap: &CoverageGap) -> Option<String> {
    if gap.kind == GapKind::File {
        return None;
    }
    let source = fs::read_to_string(repo.join(&gap.file)).ok()?;
    let excerpt = extract_lines(&source, gap.start_line, gap.end_line);
    (!excerpt.is_empty()).then_some(excerpt)
}
