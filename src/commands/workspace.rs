//! `qtest init`, `qtest list` and `qtest status`.

use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::context::ServiceContext;
use crate::workspace::{TargetStatus, Workspace};

/// Execute the `init` command.
///
/// Creates a workspace pointing at `repo_path`. Without `--url` the path must
/// already be a checkout; with one, the first `generate` clones into it.
///
/// # Errors
///
/// Returns an error string if the repository is missing or the workspace cannot be written.
pub fn init(
    config: &AppConfig,
    ctx: &ServiceContext,
    repo_path: &Path,
    name: Option<&str>,
    url: Option<&str>,
) -> Result<(), String> {
    let repo_path = absolute(repo_path)?;
    if url.is_none() && !repo_path.is_dir() {
        return Err(format!("repository not found: {} (pass --url to clone)", repo_path.display()));
    }

    let name = name.map_or_else(
        || {
            repo_path
                .file_name()
                .map_or_else(|| "repo".to_string(), |n| n.to_string_lossy().into_owned())
        },
        str::to_string,
    );
    let url = url.map_or_else(|| repo_path.display().to_string(), str::to_string);
    let ws_config = config.workspace_config();
    let ws = Workspace::create(&name, &url, Some(repo_path.clone()), &ws_config, ctx)
        .map_err(|e| e.to_string())?;

    println!("Created workspace {} ({name})", ws.id());
    println!("  repository: {}", repo_path.display());
    println!("  state:      {}", ws.root().display());
    println!("\nNext: qtest generate {}", ws.id());
    Ok(())
}

/// Execute the `list` command.
///
/// # Errors
///
/// Returns an error string if the workspace directory cannot be read.
pub fn list(config: &AppConfig, ctx: &ServiceContext) -> Result<(), String> {
    let workspaces = Workspace::list(&config.workspace_config(), ctx).map_err(|e| e.to_string())?;
    if workspaces.is_empty() {
        println!("No workspaces in {}.", config.home.display());
        return Ok(());
    }

    let rows: Vec<(String, String, String, String)> = workspaces
        .iter()
        .map(|ws| {
            let summary = ws.summary();
            let done = summary.completed + summary.failed + summary.skipped;
            (
                summary.id,
                summary.name,
                summary.phase.as_str().to_string(),
                format!("{done}/{} ({})", summary.total, summary.progress),
            )
        })
        .collect();

    let id_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(2).max(2);
    let name_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(4).max(4);
    let phase_width = rows.iter().map(|r| r.2.len()).max().unwrap_or(5).max(5);

    println!("{:<id_width$}  {:<name_width$}  {:<phase_width$}  PROGRESS", "ID", "NAME", "PHASE");
    println!("{:-<id_width$}  {:-<name_width$}  {:-<phase_width$}  --------", "", "", "");
    for (id, name, phase, progress) in &rows {
        println!("{id:<id_width$}  {name:<name_width$}  {phase:<phase_width$}  {progress}");
    }
    println!("\n{} workspace(s).", rows.len());
    Ok(())
}

/// Execute the `status` command.
///
/// # Errors
///
/// Returns an error string if the workspace cannot be loaded.
pub fn status(config: &AppConfig, ctx: &ServiceContext, id: &str) -> Result<(), String> {
    let ws = Workspace::load_by_id(id, &config.workspace_config(), ctx).map_err(|e| e.to_string())?;
    let meta = ws.meta();
    let summary = ws.summary();
    let state = ws.snapshot();

    println!("Workspace {} ({})", meta.id, meta.name);
    println!("  repository: {}", meta.repo_url);
    if !meta.branch.is_empty() {
        println!("  branch:     {} (from {})", meta.branch, meta.base_branch);
    }
    println!("  language:   {}", meta.language);
    println!("  phase:      {}", summary.phase.as_str());
    println!(
        "  targets:    {} total, {} completed, {} failed, {} skipped, {} pending ({})",
        summary.total,
        summary.completed,
        summary.failed,
        summary.skipped,
        summary.pending,
        summary.progress
    );
    println!("  tests:      {} written, {} committed", state.tests_written(), state.commits());
    if let Some(paused) = state.paused_at {
        println!("  paused at:  {paused}");
    }

    let failures: Vec<_> =
        state.targets.values().filter(|t| t.status == TargetStatus::Failed).collect();
    if !failures.is_empty() {
        println!("\nFailed targets:");
        for target in failures {
            println!("  {}  {}", target.id, target.error.as_deref().unwrap_or("unknown error"));
        }
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf, String> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| format!("cannot resolve {}: {e}", path.display()))?;
    Ok(cwd.join(path))
}
