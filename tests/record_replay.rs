//! Record a generate run through the binary, then replay it in-process.

mod common;

use std::fs;

use common::{only_subdir, stderr, Sandbox, CALC_PY};
use qtest::cancel::CancelToken;
use qtest::context::ServiceContext;
use qtest::workspace::runner::{RunConfig, RunOutcome, Runner};
use qtest::workspace::{Workspace, WorkspaceConfig};

#[tokio::test]
async fn recorded_generate_replays_without_network() {
    let sandbox = Sandbox::new(&[("calc.py", CALC_PY)]);
    let id = sandbox.init();
    let record_dir = sandbox.dir.path().join("rec");

    let output = sandbox
        .command(&["generate", &id, "--no-commit"])
        .env("QTEST_RECORD", &record_dir)
        .output()
        .unwrap();
    assert!(output.status.success(), "generate failed: {}", stderr(&output));
    assert!(stderr(&output).contains("Recording saved to:"));

    let session = only_subdir(&record_dir);
    let llm = fs::read_to_string(session.join("llm.cassette.yaml")).unwrap();
    assert_eq!(llm.matches("ANTHROPIC_API_KEY").count(), 2);
    assert!(session.join("git.cassette.yaml").exists());

    let ctx = ServiceContext::replaying(&session).unwrap();
    let repo = sandbox.repo();
    let home = sandbox.dir.path().join("replay-home");
    let config = WorkspaceConfig::new(&home);
    let ws = Workspace::create("replay", repo.to_str().unwrap(), Some(repo.clone()), &config, &ctx)
        .unwrap();

    let run_config = RunConfig { commit_each: false, ..RunConfig::default() };
    let mut runner = Runner::new(&ws, &ctx, run_config);
    assert_eq!(runner.initialize().unwrap(), 2);
    let outcome = runner.run(&CancelToken::new()).await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed { processed: 2, validation: None });
    let state = ws.snapshot();
    assert_eq!((state.completed, state.failed), (0, 2));
    assert!(state
        .targets
        .values()
        .all(|t| t.error.as_deref().is_some_and(|e| e.contains("ANTHROPIC_API_KEY"))));
}
