//! `qtest coverage` and `qtest coverage-import`.

use std::path::Path;

use super::block_on_cancellable;
use crate::config::AppConfig;
use crate::context::ServiceContext;
use crate::coverage::{CoverageCollector, CoverageFormat};
use crate::model::Language;
use crate::workspace::artifacts::ArtifactManager;
use crate::workspace::coverage_runner::{CoverageRunConfig, CoverageRunner, StopReason};
use crate::workspace::Workspace;

/// Flags accepted by `coverage`.
#[derive(Debug, Clone)]
pub struct CoverageOptions {
    /// Target percentage.
    pub target: f64,
    /// Round budget.
    pub max_iterations: usize,
    /// Specs per round.
    pub max_tests: usize,
    /// Sort intents by priority.
    pub focus_critical: bool,
    /// Generate without writing.
    pub dry_run: bool,
    /// Commit after each round.
    pub commit: bool,
    /// Language override.
    pub language: Option<Language>,
}

/// Execute the `coverage` command.
///
/// # Errors
///
/// Returns an error string if the workspace cannot be loaded or the run fails.
pub fn run(
    config: &AppConfig,
    ctx: &ServiceContext,
    id: &str,
    options: &CoverageOptions,
) -> Result<(), String> {
    let ws =
        Workspace::load_by_id(id, &config.workspace_config(), ctx).map_err(|e| e.to_string())?;
    let run_config = CoverageRunConfig {
        target_coverage: options.target,
        max_iterations: options.max_iterations,
        max_tests_per_run: options.max_tests,
        focus_critical: options.focus_critical,
        dry_run: options.dry_run,
        commit_each: options.commit,
        language: options.language,
        ..CoverageRunConfig::default()
    };

    let mut runner = CoverageRunner::new(&ws, ctx, run_config);
    let outcome = block_on_cancellable(|cancel| async move { runner.run(&cancel).await })?
        .map_err(|e| e.to_string())?;

    for round in &outcome.rounds {
        let after = round.coverage_after.map_or_else(|| "-".to_string(), |c| format!("{c:.1}%"));
        println!(
            "round {}: {:.1}% -> {after}, {} gap(s), {}/{} spec(s){}",
            round.iteration,
            round.coverage_before,
            round.gaps,
            round.specs,
            round.intents,
            round.test_file.as_deref().map_or_else(String::new, |f| format!(", wrote {f}")),
        );
    }
    let reason = match outcome.stop_reason {
        StopReason::TargetReached => "target reached".to_string(),
        StopReason::NoGaps => "no gaps left".to_string(),
        StopReason::BudgetExhausted => format!("used all {} round(s)", options.max_iterations),
        StopReason::Cancelled => format!("interrupted; continue with `qtest coverage {id}`"),
    };
    println!(
        "Coverage {:.1}% -> {:.1}% (target {:.1}%): {reason}.",
        outcome.initial_coverage, outcome.final_coverage, options.target
    );
    Ok(())
}

/// Execute the `coverage-import` command.
///
/// Parses an existing coverage file and stores it as the `coverage` artifact.
///
/// # Errors
///
/// Returns an error string if the file cannot be parsed or the artifact cannot be written.
pub fn import(
    config: &AppConfig,
    ctx: &ServiceContext,
    id: &str,
    file: &Path,
    format: CoverageFormat,
) -> Result<(), String> {
    let ws =
        Workspace::load_by_id(id, &config.workspace_config(), ctx).map_err(|e| e.to_string())?;
    let collector =
        CoverageCollector::new(ctx.shell.as_ref(), ctx.clock.as_ref(), ws.scratch_dir());
    let report = collector
        .parse_file(file, format, &ws.repo_path(), ws.language())
        .map_err(|e| e.to_string())?;
    let path = ArtifactManager::for_workspace(&ws, ctx.clock.as_ref())
        .write_coverage(&report)
        .map_err(|e| e.to_string())?;

    println!("{}", report.summary_line());
    println!("Saved {}", path.display());
    Ok(())
}
