//! `qtest generate` and `qtest resume`.

use tracing::warn;

use super::block_on_cancellable;
use crate::config::{AppConfig, ProjectConfig};
use crate::context::ServiceContext;
use crate::ports::Tier;
use crate::workspace::runner::{RunConfig, RunOutcome, Runner};
use crate::workspace::{Phase, Workspace};

/// Flags accepted by `generate`.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Generate specs without writing files.
    pub dry_run: bool,
    /// Commit each test.
    pub commit: bool,
    /// Stop after this many targets.
    pub max_tests: Option<usize>,
    /// Run written tests afterwards.
    pub validate: bool,
    /// Model tier override.
    pub tier: Option<Tier>,
}

/// Execute the `generate` command.
///
/// Discovers targets (again, for a finished workspace; known targets are kept)
/// and generates a test for each pending one.
///
/// # Errors
///
/// Returns an error string if the workspace has an unfinished run, or
/// initialization or the run fails.
pub fn generate(
    config: &AppConfig,
    ctx: &ServiceContext,
    id: &str,
    options: &GenerateOptions,
) -> Result<(), String> {
    let ws =
        Workspace::load_by_id(id, &config.workspace_config(), ctx).map_err(|e| e.to_string())?;
    if matches!(ws.phase(), Phase::Paused | Phase::Generating) {
        return Err(format!(
            "workspace {id} has an unfinished run; continue it with `qtest resume {id}`"
        ));
    }

    let run_config = RunConfig {
        tier: options.tier,
        commit_each: options.commit,
        dry_run: options.dry_run,
        validate_tests: options.validate,
        max_tests: options.max_tests,
        ..RunConfig::default()
    };
    let mut runner = Runner::new(&ws, ctx, run_config);
    let added = runner.initialize().map_err(|e| e.to_string())?;
    println!("Discovered {added} new target(s); {} pending.", ws.snapshot().pending());

    let outcome = block_on_cancellable(|cancel| async move { runner.run(&cancel).await })?
        .map_err(|e| e.to_string())?;
    report(&ws, id, outcome);
    Ok(())
}

/// Execute the `resume` command.
///
/// Targets left `running` by a crash are retried. Commits continue when the
/// original run created a branch.
///
/// # Errors
///
/// Returns an error string if the workspace is not paused or the run fails.
pub fn resume(config: &AppConfig, ctx: &ServiceContext, id: &str) -> Result<(), String> {
    let ws =
        Workspace::load_by_id(id, &config.workspace_config(), ctx).map_err(|e| e.to_string())?;

    let mut run_config =
        RunConfig { commit_each: !ws.meta().branch.is_empty(), ..RunConfig::default() };
    match ProjectConfig::load(&ws.repo_path()) {
        Ok(project) => run_config.apply_project_config(&project),
        Err(e) => warn!(error = %e, "ignoring unreadable project config"),
    }

    let mut runner = Runner::new(&ws, ctx, run_config);
    let outcome = block_on_cancellable(|cancel| async move { runner.resume(&cancel).await })?
        .map_err(|e| e.to_string())?;
    report(&ws, id, outcome);
    Ok(())
}

fn report(ws: &Workspace, id: &str, outcome: RunOutcome) {
    let summary = ws.summary();
    match outcome {
        RunOutcome::Completed { processed, validation } => {
            println!("Processed {processed} target(s); run complete.");
            if let Some(tests) = validation {
                println!(
                    "Validation: {} passed, {} failed, {} skipped of {} test file(s) \
                     ({:.1}% pass rate)",
                    tests.passed,
                    tests.failed,
                    tests.skipped,
                    tests.total,
                    tests.pass_rate
                );
            }
        }
        RunOutcome::Paused { processed } => {
            println!("Paused after {processed} target(s). Continue with `qtest resume {id}`.");
        }
        RunOutcome::LimitReached { processed } => {
            println!(
                "Stopped at the limit of {processed} target(s). \
                 Continue with `qtest resume {id}`."
            );
        }
    }
    println!(
        "{} completed, {} failed, {} skipped, {} pending ({})",
        summary.completed, summary.failed, summary.skipped, summary.pending, summary.progress
    );
}
