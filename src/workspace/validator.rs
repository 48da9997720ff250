//! Runs generated test files and records the execution artifact.

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use super::artifacts::{
    ArtifactManager, ExecutionReport, ExecutionSummary, TestOutcome, TestResult, ARTIFACT_VERSION,
};
use super::{TargetState, TargetStatus, Workspace};
use crate::context::ServiceContext;
use crate::ports::CommandSpec;

/// Runs each completed target's test file through the shell port.
pub struct TestValidator<'a> {
    workspace: &'a Workspace,
    ctx: &'a ServiceContext,
}

impl<'a> TestValidator<'a> {
    /// Validates tests written into `workspace`.
    #[must_use]
    pub fn new(workspace: &'a Workspace, ctx: &'a ServiceContext) -> Self {
        Self { workspace, ctx }
    }

    /// Runs every completed target's test file and writes `execution.json`.
    ///
    /// Failures to write the artifact are logged; the report is still returned.
    #[must_use]
    pub fn validate_all(&self) -> ExecutionReport {
        let started = Instant::now();
        let repo = self.workspace.repo_path();
        let results: Vec<TestResult> = self
            .workspace
            .snapshot()
            .targets
            .values()
            .filter(|t| t.status == TargetStatus::Completed)
            .filter_map(|t| t.test_file.as_deref().map(|file| self.validate(&repo, t, file)))
            .collect();

        let artifacts = ArtifactManager::for_workspace(self.workspace, self.ctx.clock.as_ref());
        match artifacts.write_execution(results.clone(), started.elapsed()) {
            Ok(report) => {
                info!(
                    total = report.summary.total,
                    passed = report.summary.passed,
                    "validated generated tests"
                );
                report
            }
            Err(e) => {
                warn!(error = %e, "failed to write execution artifact");
                ExecutionReport {
                    version: ARTIFACT_VERSION.to_string(),
                    executed_at: self.ctx.clock.now(),
                    duration_seconds: started.elapsed().as_secs(),
                    summary: ExecutionSummary::from_results(&results),
                    tests: results,
                }
            }
        }
    }

    fn validate(&self, repo: &Path, target: &TargetState, test_file: &str) -> TestResult {
        let started = Instant::now();
        let mut result = TestResult {
            id: target.id.clone(),
            name: target.name.clone(),
            file: test_file.to_string(),
            target: target.name.clone(),
            status: TestOutcome::Skipped,
            duration_ms: 0,
            error: None,
        };

        let Some(command) = test_command(repo, test_file) else {
            result.error = Some(format!("unsupported test file type: {test_file}"));
            return result;
        };

        match self.ctx.shell.run(&command) {
            Ok(output) if output.success() => result.status = TestOutcome::Passed,
            Ok(output) => {
                result.status = TestOutcome::Failed;
                result.error = Some(format!("tests failed (exit code {})", output.exit_code));
            }
            Err(e) => {
                result.status = TestOutcome::Failed;
                result.error = Some(e.to_string());
            }
        }
        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        result
    }
}

/// Command that runs one test file, chosen by its extension.
#[must_use]
pub fn test_command(repo: &Path, test_file: &str) -> Option<CommandSpec> {
    let path = Path::new(test_file);
    match path.extension().and_then(|e| e.to_str())? {
        "go" => {
            let dir = path.parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
            let pkg = if dir.is_empty() { "./".to_string() } else { format!("./{dir}") };
            Some(CommandSpec::new("go", ["test".to_string(), "-v".to_string(), pkg], repo))
        }
        "py" => Some(CommandSpec::new("python", ["-m", "pytest", "-v", test_file], repo)),
        "js" | "ts" => Some(CommandSpec::new("npx", ["jest", "--verbose", test_file], repo)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::{test_context, ScriptedShell};
    use crate::workspace::tests::function;
    use crate::workspace::{TargetUpdate, WorkspaceConfig};

    #[test]
    fn commands_follow_extension() {
        let repo = Path::new("/r");
        assert_eq!(test_command(repo, "pkg/calc_test.go").unwrap().args, ["test", "-v", "./pkg"]);
        assert_eq!(test_command(repo, "calc_test.go").unwrap().args, ["test", "-v", "./"]);
        assert_eq!(test_command(repo, "tests/app_test.py").unwrap().program, "python");
        assert_eq!(test_command(repo, "src/a_test.ts").unwrap().program, "npx");
        assert!(test_command(repo, "src/a_test.yaml").is_none());
    }

    fn completed_workspace(dir: &Path, ctx: &ServiceContext) -> Workspace {
        let config = WorkspaceConfig::new(dir);
        let ws = Workspace::create("v", "u", Some(dir.join("repo")), &config, ctx).unwrap();
        ws.add_targets(
            &[function("A", 1, true), function("B", 2, true), function("C", 3, true)],
            "m.py",
        );
        ws
    }

    #[test]
    fn records_pass_fail_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context();
        ctx.shell = Box::new(ScriptedShell::with_exit_codes([0, 1]));
        let ws = completed_workspace(dir.path(), &ctx);
        ws.update_target("m.py:1:A", TargetUpdate::completed(Some("m_test.py".into()))).unwrap();
        ws.update_target("m.py:2:B", TargetUpdate::completed(Some("m_test.py".into()))).unwrap();
        ws.update_target("m.py:3:C", TargetUpdate::completed(Some("m_test.yaml".into()))).unwrap();

        let report = TestValidator::new(&ws, &ctx).validate_all();
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.skipped, 1);
        assert!(ws.artifacts_dir().join("execution.json").exists());
    }

    #[test]
    fn unwritable_artifact_still_reports_totals() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context();
        ctx.shell = Box::new(ScriptedShell::with_exit_codes([0, 1]));
        let ws = completed_workspace(dir.path(), &ctx);
        ws.update_target("m.py:1:A", TargetUpdate::completed(Some("m_test.py".into()))).unwrap();
        ws.update_target("m.py:2:B", TargetUpdate::completed(Some("m_test.py".into()))).unwrap();
        std::fs::create_dir_all(ws.artifacts_dir().join("execution.json")).unwrap();

        let report = TestValidator::new(&ws, &ctx).validate_all();
        assert_eq!(report.tests.len(), 2);
        assert_eq!(report.summary.total, 2);
        assert_eq!((report.summary.passed, report.summary.failed), (1, 1));
        assert!((report.summary.pass_rate - 50.0).abs() < 1e-9);
    }
}
