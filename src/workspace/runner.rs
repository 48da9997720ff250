//! Sequential driver: one target at a time, persisting after each.
//!
//! [`Runner::initialize`] discovers targets and writes the test plan;
//! [`Runner::run`] then repeatedly takes the next pending target, asks the
//! spec generator for a test, renders it, writes it and saves the workspace.
//! Cancellation is checked between targets, so a paused run loses at most
//! the target in flight, which [`Runner::resume`] puts back to pending.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use super::artifacts::{ArtifactManager, ExecutionSummary, RunMode};
use super::validator::TestValidator;
use super::{Phase, TargetState, TargetUpdate, Workspace, WorkspaceError};
use crate::cancel::CancelToken;
use crate::config::{compile_patterns, PathPattern, ProjectConfig};
use crate::context::ServiceContext;
use crate::coverage::CoverageError;
use crate::model::{Language, ModelFunction, Priority, SystemModel, TestIntent, TestLevel};
use crate::ports::{CodeEmitter, Tier};

/// Directories never descended into while discovering sources.
const SKIP_DIRS: [&str; 5] = ["node_modules", "vendor", ".git", "__pycache__", "target"];

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The repository checkout is missing and there is nothing to clone from.
    #[error("repository not found at {0}")]
    RepoMissing(PathBuf),

    /// Cloning the repository failed.
    #[error("clone of {url} failed: {message}")]
    Clone {
        /// Remote URL.
        url: String,
        /// VCS error.
        message: String,
    },

    /// The workspace is not in a phase that can be resumed.
    #[error("workspace is {0}, not paused")]
    NotResumable(Phase),

    /// No coverage tool applies to the workspace's language.
    #[error("{0}; pass --language or set `language` in .qtest.yaml")]
    CoverageUnavailable(#[source] CoverageError),

    /// Workspace state could not be persisted or updated.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

/// Failure generating the test for one target. Recorded on the target; never aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// The source file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadSource {
        /// Source path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The source parser rejected the file.
    #[error("failed to parse {file}: {message}")]
    Parse {
        /// Source file.
        file: String,
        /// Parser error.
        message: String,
    },

    /// The function is no longer where the plan recorded it.
    #[error("function not found: {name} at line {line}")]
    FunctionNotFound {
        /// Function name.
        name: String,
        /// Recorded line.
        line: u32,
    },

    /// Spec generation failed.
    #[error("spec generation failed: {0}")]
    Spec(String),

    /// Rendering the spec failed.
    #[error("code emission failed: {0}")]
    Emit(String),

    /// The test file could not be written.
    #[error("failed to write {path}: {source}")]
    WriteTest {
        /// Test path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Settings for a sequential run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Model tier; `None` defers to `.qtest.yaml`, then [`Tier::Balanced`].
    pub tier: Option<Tier>,
    /// Commit each test as it is written.
    pub commit_each: bool,
    /// Branch tests are committed to.
    pub branch_name: String,
    /// Directory (relative to the repo) mirroring sources; `None` writes beside them.
    pub test_dir: Option<String>,
    /// Generate specs but write and commit nothing.
    pub dry_run: bool,
    /// Parallel generations. Only 1 is supported.
    pub max_concurrent: usize,
    /// Source files to consider.
    pub file_patterns: Vec<String>,
    /// Source files to ignore.
    pub exclude_patterns: Vec<String>,
    /// Run written tests after the loop.
    pub validate_tests: bool,
    /// Stop after this many targets in one invocation.
    pub max_tests: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tier: None,
            commit_each: true,
            branch_name: "qtest/generated-tests".to_string(),
            test_dir: None,
            dry_run: false,
            max_concurrent: 1,
            file_patterns: ["*.go", "*.py", "*.ts", "*.js"].map(String::from).to_vec(),
            exclude_patterns: Vec::new(),
            validate_tests: false,
            max_tests: None,
        }
    }
}

impl RunConfig {
    /// Fills unset values from the repository's project config.
    pub fn apply_project_config(&mut self, project: &ProjectConfig) {
        if self.tier.is_none() {
            self.tier = project.tier();
        }
        if self.test_dir.is_none() {
            self.test_dir.clone_from(&project.framework.test_dir);
        }
        if !project.include.is_empty() {
            self.file_patterns.clone_from(&project.include);
        }
        for pattern in &project.exclude {
            if !self.exclude_patterns.contains(pattern) {
                self.exclude_patterns.push(pattern.clone());
            }
        }
        debug!(
            tier = ?self.tier,
            test_dir = ?self.test_dir,
            patterns = ?self.file_patterns,
            "applied project config"
        );
    }

    /// Effective model tier.
    #[must_use]
    pub fn effective_tier(&self) -> Tier {
        self.tier.unwrap_or_default()
    }

    /// Path of the test file for `source` (relative to the repo root).
    ///
    /// `<dir>/<stem>_test<ext>`, or the same under `test_dir` when set.
    #[must_use]
    pub fn test_path(&self, source: &str, extension: &str) -> String {
        let source = Path::new(source);
        let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let parent = source.parent().unwrap_or_else(|| Path::new(""));
        let dir = match &self.test_dir {
            Some(test_dir) => Path::new(test_dir).join(parent),
            None => parent.to_path_buf(),
        };
        dir.join(format!("{stem}_test{extension}")).to_string_lossy().into_owned()
    }
}

/// How a call to [`Runner::run`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// No pending targets remain.
    Completed {
        /// Targets attempted in this invocation.
        processed: usize,
        /// Totals from running the written tests, when validation was requested.
        validation: Option<ExecutionSummary>,
    },
    /// Cancelled; the workspace is paused and resumable.
    Paused {
        /// Targets attempted in this invocation.
        processed: usize,
    },
    /// `max_tests` reached with targets still pending; the workspace is paused.
    LimitReached {
        /// Targets attempted in this invocation.
        processed: usize,
    },
}

/// Sequential test generation over a workspace.
pub struct Runner<'a> {
    workspace: &'a Workspace,
    ctx: &'a ServiceContext,
    config: RunConfig,
}

impl<'a> Runner<'a> {
    /// Creates a runner over `workspace`.
    #[must_use]
    pub fn new(workspace: &'a Workspace, ctx: &'a ServiceContext, config: RunConfig) -> Self {
        Self { workspace, ctx, config }
    }

    /// Current settings (after project config has been applied).
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn artifacts(&self) -> ArtifactManager<'_> {
        ArtifactManager::for_workspace(self.workspace, self.ctx.clock.as_ref())
    }

    /// Clones if needed, discovers targets and writes the test plan.
    ///
    /// Returns the number of targets added.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] if the repository is unavailable or the
    /// workspace cannot be saved. The workspace is marked `failed` first.
    pub fn initialize(&mut self) -> Result<usize, RunError> {
        match self.prepare() {
            Ok(added) => Ok(added),
            Err(e) => {
                self.workspace.set_phase(Phase::Failed);
                if let Err(save) = self.workspace.save() {
                    warn!(error = %save, "failed to persist failed phase");
                }
                Err(e)
            }
        }
    }

    fn prepare(&mut self) -> Result<usize, RunError> {
        let repo = self.ensure_repo()?;

        self.workspace.set_phase(Phase::Parsing);
        let project = ProjectConfig::load(&repo).unwrap_or_else(|e| {
            warn!(error = %e, "failed to load project config, using defaults");
            ProjectConfig::default()
        });
        self.config.apply_project_config(&project);
        if let Some(language) = project.language() {
            self.workspace.set_language(language);
        }

        match self.ctx.git.current_commit(&repo) {
            Ok(sha) => self.workspace.set_commit_sha(&sha),
            Err(e) => debug!(error = %e, "could not read HEAD commit"),
        }
        if self.config.commit_each && !self.config.dry_run && !self.config.branch_name.is_empty() {
            self.create_branch(&repo);
        }

        let added = self.discover(&repo);
        info!(workspace = %self.workspace.id(), targets = added, "found testable targets");

        self.workspace.set_phase(Phase::Planning);
        self.workspace.save()?;
        if let Err(e) = self.artifacts().write_test_plan(self.workspace) {
            warn!(error = %e, "failed to write test plan artifact");
        }
        Ok(added)
    }

    fn ensure_repo(&self) -> Result<PathBuf, RunError> {
        let repo = self.workspace.repo_path();
        if repo.is_dir() {
            return Ok(repo);
        }
        let url = self.workspace.meta().repo_url;
        if url.is_empty() || Path::new(&url).exists() {
            return Err(RunError::RepoMissing(repo));
        }

        self.workspace.set_phase(Phase::Cloning);
        info!(url = %url, dest = %repo.display(), "cloning repository");
        self.ctx
            .git
            .clone_repo(&url, &repo)
            .map_err(|e| RunError::Clone { url: url.clone(), message: e.to_string() })?;
        Ok(repo)
    }

    fn create_branch(&self, repo: &Path) {
        let base = self.ctx.git.current_branch(repo).unwrap_or_default();
        match self.ctx.git.create_branch(repo, &self.config.branch_name) {
            Ok(()) => self.workspace.set_branches(&self.config.branch_name, &base),
            Err(e) => {
                warn!(
                    branch = %self.config.branch_name,
                    error = %e,
                    "failed to create branch, continuing on current branch"
                );
                self.workspace.set_branches(&base, &base);
            }
        }
    }

    fn discover(&self, repo: &Path) -> usize {
        let includes = compile_patterns(&self.config.file_patterns);
        let excludes = compile_patterns(&self.config.exclude_patterns);
        let mut added = 0;

        let walker = WalkDir::new(repo)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable path");
                    continue;
                }
            };
            if !entry.file_type().is_file()
                || is_test_file(entry.file_name().to_string_lossy().as_ref())
            {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(repo) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if !matches_any(&includes, &relative) || matches_any(&excludes, &relative) {
                continue;
            }
            added += self.discover_file(entry.path(), &relative);
        }
        added
    }

    fn discover_file(&self, path: &Path, relative: &str) -> usize {
        let language = Language::detect(path);
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                debug!(file = relative, error = %e, "skipping unreadable file");
                return 0;
            }
        };
        let parsed = match self.ctx.parser.parse(path, &source, language) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(file = relative, error = %e, "skipping file");
                return 0;
            }
        };
        if !self.workspace.language().is_known() && parsed.language.is_known() {
            self.workspace.set_language(parsed.language);
        }
        let added = self.workspace.add_targets(&parsed.functions, relative);
        debug!(file = relative, functions = parsed.functions.len(), added, "parsed file");
        added
    }

    /// Processes pending targets until none remain, the limit is hit, or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] only when workspace state cannot be updated;
    /// per-target failures are recorded on the target.
    pub async fn run(&mut self, cancel: &CancelToken) -> Result<RunOutcome, RunError> {
        let started_at = self.workspace.mark_started();
        if let Err(e) = self.workspace.save() {
            warn!(error = %e, "failed to save workspace state");
        }

        let total = self.workspace.snapshot().total_targets;
        let mut processed = 0;
        loop {
            if cancel.is_cancelled() {
                info!(workspace = %self.workspace.id(), processed, "pausing");
                self.pause()?;
                return Ok(RunOutcome::Paused { processed });
            }
            let Some(target) = self.workspace.next_target() else {
                break;
            };
            if self.config.max_tests.is_some_and(|max| processed >= max) {
                info!(limit = processed, "test limit reached");
                self.pause()?;
                return Ok(RunOutcome::LimitReached { processed });
            }

            processed += 1;
            info!(
                target = %target.name,
                file = %target.file,
                progress = processed,
                total,
                "generating test"
            );
            self.workspace.update_target(&target.id, TargetUpdate::running())?;

            match self.generate_test(&target).await {
                Ok(test_file) => {
                    self.workspace
                        .update_target(&target.id, TargetUpdate::completed(test_file.clone()))?;
                    let committing = self.config.commit_each && !self.config.dry_run;
                    if let Some(file) = test_file.filter(|_| committing) {
                        self.commit(&target, &file);
                    }
                }
                Err(e) => {
                    warn!(target = %target.name, error = %e, "generation failed");
                    self.workspace.update_target(&target.id, TargetUpdate::failed(e.to_string()))?;
                }
            }

            if let Err(e) = self.workspace.save() {
                warn!(error = %e, "failed to save workspace state");
            }
        }

        self.workspace.set_phase(Phase::Completed);
        let validation = (self.config.validate_tests && !self.config.dry_run).then(|| {
            info!("validating generated tests");
            TestValidator::new(self.workspace, self.ctx).validate_all().summary
        });
        if let Err(e) =
            self.artifacts().write_summary(self.workspace, started_at, RunMode::Sequential, None)
        {
            warn!(error = %e, "failed to write summary artifact");
        }
        self.workspace.save()?;
        Ok(RunOutcome::Completed { processed, validation })
    }

    /// Continues a paused (or crashed) run.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::NotResumable`] unless the workspace is `paused`
    /// or was left `generating` by a crash.
    pub async fn resume(&mut self, cancel: &CancelToken) -> Result<RunOutcome, RunError> {
        let phase = self.workspace.phase();
        if !matches!(phase, Phase::Paused | Phase::Generating) {
            return Err(RunError::NotResumable(phase));
        }
        self.workspace.reset_running();
        self.run(cancel).await
    }

    /// Marks the workspace paused and saves it.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] if the state cannot be saved.
    pub fn pause(&self) -> Result<(), RunError> {
        self.workspace.mark_paused();
        self.workspace.save()?;
        Ok(())
    }

    async fn generate_test(&self, target: &TargetState) -> Result<Option<String>, TargetError> {
        let repo = self.workspace.repo_path();
        let path = repo.join(&target.file);
        let source = fs::read_to_string(&path)
            .map_err(|source| TargetError::ReadSource { path: path.clone(), source })?;

        let language = Language::detect(&path);
        let parsed = self
            .ctx
            .parser
            .parse(&path, &source, language)
            .map_err(|e| TargetError::Parse { file: target.file.clone(), message: e.to_string() })?;
        let func = parsed
            .functions
            .iter()
            .find(|f| f.name == target.name && f.start_line == target.line)
            .ok_or_else(|| TargetError::FunctionNotFound {
                name: target.name.clone(),
                line: target.line,
            })?;

        let body = extract_lines(&source, func.start_line, func.end_line);
        let intent = TestIntent {
            id: format!("gen:{}", target.id),
            level: TestLevel::Unit,
            target_kind: target.kind.as_str().to_string(),
            target_id: target.id.clone(),
            priority: Priority::Medium,
            reason: format!("Generate unit tests for {} in {}", func.name, target.file),
            source: Some(body),
        };
        let meta = self.workspace.meta();
        let model = SystemModel {
            id: meta.id,
            repository: meta.repo_url,
            language,
            functions: vec![ModelFunction {
                id: target.id.clone(),
                name: func.name.clone(),
                file: target.file.clone(),
                start_line: func.start_line,
                end_line: func.end_line,
                exported: func.exported,
            }],
        };

        let spec = self
            .ctx
            .specgen
            .generate(&intent, &model, self.config.effective_tier())
            .await
            .map_err(|e| TargetError::Spec(e.to_string()))?;
        match serde_json::to_value(&spec) {
            Ok(value) => {
                if let Err(e) = self.workspace.mark_spec_generated(&target.id, &spec.id, value) {
                    warn!(target = %target.id, error = %e, "failed to store spec");
                }
            }
            Err(e) => warn!(target = %target.id, error = %e, "failed to encode spec"),
        }

        if self.config.dry_run {
            return Ok(None);
        }

        let emitted = self.ctx.emitter.emit(&[spec]).map_err(|e| TargetError::Emit(e.to_string()))?;
        let relative = self.config.test_path(&target.file, &emitted.extension);
        let test_path = repo.join(&relative);
        if let Some(parent) = test_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| TargetError::WriteTest { path: parent.to_path_buf(), source })?;
        }
        let label = format!("tests for {}", target.name);
        write_or_append(&test_path, self.ctx.emitter.as_ref(), &label, &emitted.source)
            .map_err(|source| TargetError::WriteTest { path: test_path, source })?;
        Ok(Some(relative))
    }

    fn commit(&self, target: &TargetState, test_file: &str) {
        let repo = self.workspace.repo_path();
        let message = format!("test: add generated tests for {}", target.name);
        match self.ctx.git.commit(&repo, Path::new(test_file), &message) {
            Ok(sha) => {
                if let Err(e) = self.workspace.set_commit(&target.id, &sha) {
                    warn!(error = %e, "failed to record commit");
                }
            }
            Err(e) => warn!(target = %target.name, error = %e, "failed to commit test"),
        }
    }
}

/// Writes `source` to `path`, or appends it after a section break when the file exists.
pub(crate) fn write_or_append(
    path: &Path,
    emitter: &dyn CodeEmitter,
    label: &str,
    source: &str,
) -> io::Result<()> {
    let contents = match fs::read_to_string(path) {
        Ok(mut existing) => {
            if !existing.ends_with('\n') {
                existing.push('\n');
            }
            format!("{existing}{}\n{source}", emitter.section_break(label))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => source.to_string(),
        Err(e) => return Err(e),
    };
    fs::write(path, contents)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && SKIP_DIRS.iter().any(|d| entry.file_name().to_string_lossy() == *d)
}

/// Whether a file name looks like an existing test (`_test.`, `.test.`, `test_` prefix).
#[must_use]
pub fn is_test_file(name: &str) -> bool {
    name.contains("_test.") || name.contains(".test.") || name.starts_with("test_")
}

fn matches_any(patterns: &[PathPattern], relative: &str) -> bool {
    patterns.iter().any(|p| p.matches(relative))
}

/// Lines `start..=end` (1-based) of `source`, newline-terminated.
pub(crate) fn extract_lines(source: &str, start: u32, end: u32) -> String {
    let skip = start.saturating_sub(1) as usize;
    let take = end.saturating_sub(start) as usize + 1;
    source.lines().skip(skip).take(take).fold(String::new(), |mut acc, line| {
        acc.push_str(line);
        acc.push('\n');
        acc
    })
}
