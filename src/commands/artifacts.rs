//! `qtest artifacts` and `qtest mutation-import`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::AppConfig;
use crate::context::ServiceContext;
use crate::workspace::artifacts::{ArtifactManager, MutationResults};
use crate::workspace::Workspace;

/// Execute the `artifacts` command: list names, or pretty-print one artifact.
///
/// # Errors
///
/// Returns an error string if the workspace or the named artifact cannot be read.
pub fn run(
    config: &AppConfig,
    ctx: &ServiceContext,
    id: &str,
    name: Option<&str>,
) -> Result<(), String> {
    let ws =
        Workspace::load_by_id(id, &config.workspace_config(), ctx).map_err(|e| e.to_string())?;
    let artifacts = ArtifactManager::for_workspace(&ws, ctx.clock.as_ref());

    let Some(name) = name else {
        let names = artifacts.list();
        if names.is_empty() {
            println!("No artifacts yet.");
        }
        for name in names {
            println!("{name}");
        }
        return Ok(());
    };

    let value: serde_json::Value = artifacts.load(name).map_err(|e| e.to_string())?;
    let pretty = serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?;
    println!("{pretty}");
    Ok(())
}

/// Execute the `mutation-import` command.
///
/// Reads mutation-testing results as JSON and stores them as the `mutation`
/// artifact, recomputing every score from the counts.
///
/// # Errors
///
/// Returns an error string if the file cannot be read or decoded, or the
/// artifact cannot be written.
pub fn import_mutation(
    config: &AppConfig,
    ctx: &ServiceContext,
    id: &str,
    file: &Path,
) -> Result<(), String> {
    let ws =
        Workspace::load_by_id(id, &config.workspace_config(), ctx).map_err(|e| e.to_string())?;
    let raw = fs::read(file).map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    let results: MutationResults = serde_json::from_slice(&raw)
        .map_err(|e| format!("invalid mutation results in {}: {e}", file.display()))?;

    let report = ArtifactManager::for_workspace(&ws, ctx.clock.as_ref())
        .write_mutation(
            results.summary,
            results.by_test,
            results.survivors,
            Duration::from_secs(results.duration_seconds),
        )
        .map_err(|e| e.to_string())?;

    println!(
        "Mutation score: {:.1}% ({}/{} killed, {} survivor(s))",
        report.summary.mutation_score,
        report.summary.killed,
        report.summary.total_mutants,
        report.survivors.len()
    );
    Ok(())
}
