//! Service context bundling all port trait objects.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::emitter::YamlSpecEmitter;
use crate::adapters::live::git::LiveGit;
use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::adapters::live::llm::LiveLlmClient;
use crate::adapters::live::parser::RegexSourceParser;
use crate::adapters::live::shell::LiveShellExecutor;
use crate::adapters::live::specgen::LlmSpecGenerator;
use crate::adapters::recording::{RecordingGit, RecordingLlmClient, RecordingShellExecutor};
use crate::adapters::replaying::{
    load_replayer, ReplayingGit, ReplayingLlmClient, ReplayingShellExecutor,
};
use crate::cassette::session::RecordingSession;
use crate::cassette::CassetteError;
use crate::config::AppConfig;
use crate::ports::{
    Clock, CodeEmitter, GapAnalyzer, IdGenerator, LlmClient, ShellExecutor, SourceParser,
    SpecGenerator, VersionControl,
};
use crate::workspace::gaps::BlockGapAnalyzer;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, recording, replaying);
/// tests replace individual fields.
pub struct ServiceContext {
    /// Clock for timestamps; shared with open workspaces.
    pub clock: Arc<dyn Clock>,
    /// ID generator for workspace identifiers.
    pub id_gen: Box<dyn IdGenerator>,
    /// Shell executor for coverage and test commands.
    pub shell: Box<dyn ShellExecutor>,
    /// Version control on the target repository.
    pub git: Box<dyn VersionControl>,
    /// LLM client; shared with the spec generator.
    pub llm: Arc<dyn LlmClient>,
    /// Function discovery.
    pub parser: Box<dyn SourceParser>,
    /// Intent → spec generation.
    pub specgen: Box<dyn SpecGenerator>,
    /// Spec → test source rendering.
    pub emitter: Box<dyn CodeEmitter>,
    /// Coverage gap ranking.
    pub analyzer: Box<dyn GapAnalyzer>,
}

impl ServiceContext {
    fn assemble(
        shell: Box<dyn ShellExecutor>,
        git: Box<dyn VersionControl>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            clock: Arc::new(LiveClock),
            id_gen: Box::new(LiveIdGenerator),
            shell,
            git,
            specgen: Box::new(LlmSpecGenerator::new(Arc::clone(&llm))),
            llm,
            parser: Box::new(RegexSourceParser),
            emitter: Box::new(YamlSpecEmitter),
            analyzer: Box::new(BlockGapAnalyzer),
        }
    }

    /// Creates a context with real adapters for every port.
    #[must_use]
    pub fn live(config: &AppConfig) -> Self {
        Self::assemble(
            Box::new(LiveShellExecutor),
            Box::new(LiveGit),
            Arc::new(LiveLlmClient::new(config)),
        )
    }

    /// Creates a live context whose `llm`, `shell` and `git` calls are recorded.
    ///
    /// Cassettes are written under a timestamped directory inside `dir` when
    /// the returned [`RecordingSession`] is finished, which must happen after
    /// the context is dropped.
    ///
    /// # Errors
    ///
    /// Returns a [`CassetteError`] if the session directory cannot be created.
    pub fn recording_at(
        config: &AppConfig,
        dir: &Path,
    ) -> Result<(Self, RecordingSession), CassetteError> {
        let session = RecordingSession::new(dir)?;
        let ctx = Self::assemble(
            Box::new(RecordingShellExecutor::new(
                Box::new(LiveShellExecutor),
                Arc::clone(&session.shell),
            )),
            Box::new(RecordingGit::new(Box::new(LiveGit), Arc::clone(&session.git))),
            Arc::new(RecordingLlmClient::new(
                Arc::new(LiveLlmClient::new(config)),
                Arc::clone(&session.llm),
            )),
        );
        Ok((ctx, session))
    }

    /// Creates a context serving `llm`, `shell` and `git` from recorded cassettes.
    ///
    /// `path` is either one cassette file or a recording session directory.
    ///
    /// # Errors
    ///
    /// Returns a [`CassetteError`] if a cassette cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, CassetteError> {
        let replayer = load_replayer(path)?;
        Ok(Self::assemble(
            Box::new(ReplayingShellExecutor::new(Arc::clone(&replayer))),
            Box::new(ReplayingGit::new(Arc::clone(&replayer))),
            Arc::new(ReplayingLlmClient::new(replayer)),
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashSet, VecDeque};
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::model::{SystemModel, TestIntent, TestSpec};
    use crate::ports::{
        CommandSpec, CompletionFuture, CompletionRequest, PortError, ShellOutput, SpecFuture, Tier,
    };

    /// Starts at 2026-01-01T00:00:00Z and advances one second per call.
    pub(crate) struct SteppingClock(Mutex<DateTime<Utc>>);

    impl Default for SteppingClock {
        fn default() -> Self {
            Self(Mutex::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()))
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut now = self.0.lock().unwrap();
            let current = *now;
            *now = current + Duration::seconds(1);
            current
        }
    }

    /// UUID-shaped IDs whose first eight hex digits are a counter.
    #[derive(Default)]
    pub(crate) struct SequentialIds(AtomicU64);

    impl IdGenerator for SequentialIds {
        fn generate_id(&self) -> String {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            format!("{n:08x}-0000-4000-8000-000000000000")
        }
    }

    /// Exits with queued codes, then 0.
    #[derive(Default)]
    pub(crate) struct ScriptedShell {
        codes: Mutex<VecDeque<i32>>,
    }

    impl ScriptedShell {
        pub(crate) fn with_exit_codes(codes: impl IntoIterator<Item = i32>) -> Self {
            Self { codes: Mutex::new(codes.into_iter().collect()) }
        }
    }

    impl ShellExecutor for ScriptedShell {
        fn run(&self, _command: &CommandSpec) -> Result<ShellOutput, PortError> {
            let exit_code = self.codes.lock().unwrap().pop_front().unwrap_or(0);
            Ok(ShellOutput { exit_code, stdout: String::new(), stderr: String::new() })
        }
    }

    /// Writes successive Go coverage profiles to the `-coverprofile=` path,
    /// repeating the last one once the list runs out.
    pub(crate) struct ProfileShell {
        profiles: Vec<String>,
        next: Mutex<usize>,
    }

    impl ProfileShell {
        pub(crate) fn new<'a>(profiles: impl IntoIterator<Item = &'a str>) -> Self {
            Self {
                profiles: profiles.into_iter().map(str::to_string).collect(),
                next: Mutex::new(0),
            }
        }

        /// Runs successfully without producing a profile.
        pub(crate) fn empty() -> Self {
            Self { profiles: Vec::new(), next: Mutex::new(0) }
        }
    }

    impl ShellExecutor for ProfileShell {
        fn run(&self, command: &CommandSpec) -> Result<ShellOutput, PortError> {
            let target = command.args.iter().find_map(|a| a.strip_prefix("-coverprofile="));
            if let (Some(path), Some(last)) = (target, self.profiles.last()) {
                let mut next = self.next.lock().unwrap();
                let profile = self.profiles.get(*next).unwrap_or(last);
                *next += 1;
                let path = Path::new(path);
                std::fs::create_dir_all(path.parent().unwrap())?;
                std::fs::write(path, profile)?;
            }
            Ok(ShellOutput { exit_code: 0, stdout: "ok\n".into(), stderr: String::new() })
        }
    }

    /// Records branches and commits; reports `main` as the current branch.
    #[derive(Default)]
    pub(crate) struct RecordingGit {
        pub(crate) branches: Arc<Mutex<Vec<String>>>,
        pub(crate) commits: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl VersionControl for RecordingGit {
        fn clone_repo(&self, _url: &str, dest: &Path) -> Result<(), PortError> {
            std::fs::create_dir_all(dest)?;
            Ok(())
        }

        fn current_commit(&self, _repo: &Path) -> Result<String, PortError> {
            Ok(format!("{:040x}", self.commits.lock().unwrap().len()))
        }

        fn current_branch(&self, _repo: &Path) -> Result<String, PortError> {
            Ok("main".into())
        }

        fn create_branch(&self, _repo: &Path, name: &str) -> Result<(), PortError> {
            self.branches.lock().unwrap().push(name.to_string());
            Ok(())
        }

        fn commit(&self, _repo: &Path, file: &Path, message: &str) -> Result<String, PortError> {
            let mut commits = self.commits.lock().unwrap();
            commits.push((file.display().to_string(), message.to_string()));
            Ok(format!("{:040x}", commits.len()))
        }

        fn push(&self, _repo: &Path, _branch: &str) -> Result<(), PortError> {
            Ok(())
        }
    }

    /// Any completion request is a test bug; spec generation is scripted.
    struct UnreachableLlm;

    impl LlmClient for UnreachableLlm {
        fn complete(&self, _request: &CompletionRequest) -> CompletionFuture<'_> {
            Box::pin(async { Err("no LLM in tests".into()) })
        }
    }

    /// Returns a canned spec for every intent except those listed as failing.
    #[derive(Default)]
    pub(crate) struct ScriptedSpecGenerator {
        failing: HashSet<String>,
    }

    impl ScriptedSpecGenerator {
        pub(crate) fn failing_for<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
            Self { failing: ids.into_iter().map(str::to_string).collect() }
        }
    }

    impl SpecGenerator for ScriptedSpecGenerator {
        fn generate<'a>(
            &'a self,
            intent: &'a TestIntent,
            _model: &'a SystemModel,
            _tier: Tier,
        ) -> SpecFuture<'a> {
            let result = if self.failing.contains(&intent.id) {
                Err(format!("model refused {}", intent.id).into())
            } else {
                Ok(TestSpec {
                    id: format!("spec-{}", intent.id),
                    level: intent.level,
                    target_kind: intent.target_kind.clone(),
                    target_id: intent.target_id.clone(),
                    description: format!("covers {}", intent.target_id),
                    function_name: None,
                    inputs: Default::default(),
                    expected: Default::default(),
                    assertions: Vec::new(),
                    tags: vec!["generated".into()],
                    priority: Some(intent.priority),
                })
            };
            Box::pin(async move { result })
        }
    }

    /// Deterministic context: stepping clock, sequential IDs, scripted ports.
    pub(crate) fn test_context() -> ServiceContext {
        let llm: Arc<dyn LlmClient> = Arc::new(UnreachableLlm);
        ServiceContext {
            clock: Arc::new(SteppingClock::default()),
            id_gen: Box::new(SequentialIds::default()),
            shell: Box::new(ScriptedShell::default()),
            git: Box::new(RecordingGit::default()),
            llm,
            parser: Box::new(RegexSourceParser),
            specgen: Box::new(ScriptedSpecGenerator::default()),
            emitter: Box::new(YamlSpecEmitter),
            analyzer: Box::new(BlockGapAnalyzer),
        }
    }

    #[test]
    fn test_ids_have_distinct_short_prefixes() {
        let ids = SequentialIds::default();
        let a: String = ids.generate_id().chars().take(8).collect();
        let b: String = ids.generate_id().chars().take(8).collect();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn replaying_context_serves_recorded_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = RecordingSession::new(dir.path()).unwrap();
        {
            let git = crate::adapters::recording::RecordingGit::new(
                Box::new(RecordingGit::default()),
                Arc::clone(&session.git),
            );
            git.current_branch(Path::new("/repo")).unwrap();
            let shell = RecordingShellExecutor::new(
                Box::new(ScriptedShell::with_exit_codes([3])),
                Arc::clone(&session.shell),
            );
            shell.run(&CommandSpec::new("go", ["test"], "/repo")).unwrap();
        }
        let out = session.finish().unwrap();

        let ctx = ServiceContext::replaying(&out).unwrap();
        assert_eq!(ctx.git.current_branch(Path::new("/x")).unwrap(), "main");
        assert_eq!(ctx.shell.run(&CommandSpec::new("go", ["test"], "/x")).unwrap().exit_code, 3);
        let request = CompletionRequest {
            tier: Tier::Fast,
            system: None,
            prompt: "p".into(),
            max_tokens: 1,
            temperature: 0.0,
        };
        assert!(ctx.llm.complete(&request).await.is_err());
    }
}
