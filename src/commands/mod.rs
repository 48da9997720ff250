//! Command dispatch and handlers.

pub mod artifacts;
pub mod coverage;
pub mod generate;
pub mod workspace;

use std::future::Future;

use tokio::runtime::Builder;
use tracing::warn;

use crate::cancel::CancelToken;
use crate::cassette::session::RecordingSession;
use crate::cli::Command;
use crate::config::AppConfig;
use crate::context::ServiceContext;

/// Dispatch a parsed command to its handler.
///
/// When `QTEST_RECORD` is set to a directory path, `llm`, `shell` and `git`
/// interactions are recorded to per-port cassette files in that directory.
///
/// # Errors
///
/// Returns an error string if configuration fails or the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let config = AppConfig::from_env().map_err(|e| e.to_string())?;
    let (ctx, session) = if let Some(dir) = &config.record_dir {
        let (ctx, session) = ServiceContext::recording_at(&config, dir).map_err(|e| e.to_string())?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(&config), None)
    };

    let result = dispatch_with_context(command, &config, &ctx);

    // Finish recording after command completes (even on error)
    if let Some(session) = session {
        // Drop context first to release Arc references
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

/// Dispatch a command with the given service context.
fn dispatch_with_context(
    command: &Command,
    config: &AppConfig,
    ctx: &ServiceContext,
) -> Result<(), String> {
    match command {
        Command::Init { repo_path, name, url } => {
            workspace::init(config, ctx, repo_path, name.as_deref(), url.as_deref())
        }
        Command::List => workspace::list(config, ctx),
        Command::Status { id } => workspace::status(config, ctx, id),
        Command::Generate { id, dry_run, no_commit, max_tests, validate, tier } => {
            let options = generate::GenerateOptions {
                dry_run: *dry_run,
                commit: !*no_commit,
                max_tests: *max_tests,
                validate: *validate,
                tier: *tier,
            };
            generate::generate(config, ctx, id, &options)
        }
        Command::Resume { id } => generate::resume(config, ctx, id),
        Command::Coverage {
            id,
            target,
            max_iterations,
            max_tests,
            no_focus,
            dry_run,
            commit,
            language,
        } => {
            let options = coverage::CoverageOptions {
                target: *target,
                max_iterations: *max_iterations,
                max_tests: *max_tests,
                focus_critical: !*no_focus,
                dry_run: *dry_run,
                commit: *commit,
                language: *language,
            };
            coverage::run(config, ctx, id, &options)
        }
        Command::CoverageImport { id, file, format } => {
            coverage::import(config, ctx, id, file, (*format).into())
        }
        Command::MutationImport { id, file } => artifacts::import_mutation(config, ctx, id, file),
        Command::Artifacts { id, name } => artifacts::run(config, ctx, id, name.as_deref()),
    }
}

/// Runs an async driver to completion on a single-threaded runtime.
///
/// Ctrl-C cancels the token handed to `run`; drivers pause at their next
/// boundary and return normally.
pub(crate) fn block_on_cancellable<F, T>(run: impl FnOnce(CancelToken) -> F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;
    let cancel = CancelToken::new();
    let token = cancel.clone();
    Ok(runtime.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; pausing at the next boundary");
                token.cancel();
            }
        });
        run(cancel).await
    }))
}

/// Finish a recording session and print the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish().map_err(|e| e.to_string())?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}
