//! Persistent, resumable workspace state.
//!
//! A workspace is a directory under the configured base directory holding a
//! single `workspace.json` document plus an `artifacts/` folder. The document
//! is rewritten whole on every [`Workspace::save`] (temp file + rename), so a
//! crash leaves either the previous or the new state on disk, never a torn one.
//!
//! ```text
//! <base>/<id>/
//!   ├── workspace.json
//!   ├── artifacts/
//!   ├── scratch/
//!   └── repo/          (when cloned)
//! ```
//!
//! All mutation goes through methods that take the internal lock; callers
//! never see the target map directly.

pub mod artifacts;
pub mod coverage_runner;
pub mod gaps;
pub mod runner;
pub mod validator;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::ServiceContext;
use crate::model::{CoverageGap, Language};
use crate::ports::{Clock, ParsedFunction};

const STATE_FILE: &str = "workspace.json";
const STATE_TMP: &str = "workspace.json.tmp";

/// Errors raised by workspace persistence and state transitions.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// The workspace directory could not be created.
    #[error("failed to create workspace directory {path}: {source}")]
    CreateDir {
        /// Directory being created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `workspace.json` could not be read.
    #[error("failed to read workspace state at {path}: {source}")]
    Read {
        /// State file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `workspace.json` is not a valid workspace document.
    #[error("failed to parse workspace state at {path}: {source}")]
    Parse {
        /// State file path.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The state could not be serialized.
    #[error("failed to serialize workspace state: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The state could not be written or renamed into place.
    #[error("failed to write workspace state at {path}: {source}")]
    Write {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No target with this ID exists.
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    /// The target already reached a terminal status.
    #[error("target {id} is already {status}")]
    AlreadyTerminal {
        /// Target ID.
        id: String,
        /// Its current terminal status.
        status: TargetStatus,
    },
}

/// Where workspaces live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    /// Directory holding one subdirectory per workspace.
    pub base_dir: PathBuf,
}

impl WorkspaceConfig {
    /// Uses `base_dir` as the workspace root.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }
}

/// Lifecycle phase of a workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Created, nothing done yet.
    #[default]
    Init,
    /// Cloning the repository.
    Cloning,
    /// Discovering targets.
    Parsing,
    /// Targets discovered, plan written.
    Planning,
    /// Generation in progress.
    Generating,
    /// Stopped by the user; resumable.
    Paused,
    /// All targets processed.
    Completed,
    /// Aborted during initialization.
    Failed,
}

impl Phase {
    /// Lowercase name as stored on disk.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Cloning => "cloning",
            Self::Parsing => "parsing",
            Self::Planning => "planning",
            Self::Generating => "generating",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing status of one target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// Not yet attempted.
    #[default]
    Pending,
    /// Being worked on.
    Running,
    /// Test written.
    Completed,
    /// Generation failed; see the target's error.
    Failed,
    /// Deliberately not processed.
    Skipped,
}

impl TargetStatus {
    /// `true` for statuses that count toward progress.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Lowercase name as stored on disk.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a target points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Free function.
    #[default]
    Function,
    /// Method on a class or receiver.
    Method,
    /// Whole class.
    Class,
    /// Uncovered region found by coverage analysis.
    Gap,
}

impl TargetKind {
    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Gap => "gap",
        }
    }
}

/// State of one unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetState {
    /// Stable ID (`file:line:name` unless the parser supplied one).
    pub id: String,
    /// File path relative to the repository root.
    pub file: String,
    /// Function, method or region name.
    pub name: String,
    /// Target kind.
    #[serde(rename = "type")]
    pub kind: TargetKind,
    /// First line.
    pub line: u32,
    /// Current status.
    pub status: TargetStatus,
    /// Test file written for this target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_file: Option<String>,
    /// Commit containing the test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the target reached its terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// Generated spec, stored opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<serde_json::Value>,
    /// Set once coverage confirms the region is exercised.
    #[serde(default)]
    pub covered: bool,
    /// ID of the generated spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_id: Option<String>,
}

impl TargetState {
    fn pending(id: String, file: &str, name: &str, kind: TargetKind, line: u32) -> Self {
        Self {
            id,
            file: file.to_string(),
            name: name.to_string(),
            kind,
            line,
            status: TargetStatus::Pending,
            test_file: None,
            commit_sha: None,
            error: None,
            generated_at: None,
            spec: None,
            covered: false,
            spec_id: None,
        }
    }
}

/// Progress counters and the target map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceState {
    /// Current phase.
    pub phase: Phase,
    /// Number of targets ever added.
    pub total_targets: usize,
    /// Targets completed.
    pub completed: usize,
    /// Targets failed.
    pub failed: usize,
    /// Targets skipped.
    pub skipped: usize,
    /// All targets keyed by ID.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetState>,
    /// When generation first started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When generation was last paused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
}

impl WorkspaceState {
    /// Targets not yet in a terminal status.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.total_targets.saturating_sub(self.completed + self.failed + self.skipped)
    }

    /// Number of targets with a test file.
    #[must_use]
    pub fn tests_written(&self) -> usize {
        self.targets.values().filter(|t| t.test_file.is_some()).count()
    }

    /// Number of targets with a commit.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.targets.values().filter(|t| t.commit_sha.is_some()).count()
    }
}

/// Identity and repository metadata of a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceMeta {
    /// Short ID (first 8 characters of a UUID).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Remote URL, or the local path when none was given.
    pub repo_url: String,
    /// Local checkout.
    pub repo_path: PathBuf,
    /// Branch tests are committed to.
    #[serde(default)]
    pub branch: String,
    /// Branch checked out before the run.
    #[serde(default)]
    pub base_branch: String,
    /// HEAD commit when targets were discovered.
    #[serde(default)]
    pub commit_sha: String,
    /// Detected language.
    #[serde(default)]
    pub language: Language,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last save time.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    #[serde(flatten)]
    meta: WorkspaceMeta,
    state: WorkspaceState,
}

/// Result of a successful [`Workspace::update_target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Status before the update.
    pub from: TargetStatus,
    /// Status after the update.
    pub to: TargetStatus,
}

/// A requested status change for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUpdate {
    status: TargetStatus,
    test_file: Option<String>,
    error: Option<String>,
}

impl TargetUpdate {
    /// Back to pending (retry).
    #[must_use]
    pub fn pending() -> Self {
        Self { status: TargetStatus::Pending, test_file: None, error: None }
    }

    /// Work has started.
    #[must_use]
    pub fn running() -> Self {
        Self { status: TargetStatus::Running, test_file: None, error: None }
    }

    /// Test generated, optionally written to `test_file`.
    #[must_use]
    pub fn completed(test_file: Option<String>) -> Self {
        Self { status: TargetStatus::Completed, test_file, error: None }
    }

    /// Generation failed.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self { status: TargetStatus::Failed, test_file: None, error: Some(error.into()) }
    }

    /// Target deliberately not processed.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self { status: TargetStatus::Skipped, test_file: None, error: Some(reason.into()) }
    }
}

/// Counts and progress for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceSummary {
    /// Workspace ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current phase.
    pub phase: Phase,
    /// Total targets.
    pub total: usize,
    /// Completed targets.
    pub completed: usize,
    /// Failed targets.
    pub failed: usize,
    /// Skipped targets.
    pub skipped: usize,
    /// Targets still to do.
    pub pending: usize,
    /// Progress formatted as `"NN.N%"`.
    pub progress: String,
}

/// A workspace on disk, with its state behind a lock.
pub struct Workspace {
    id: String,
    root: PathBuf,
    clock: Arc<dyn Clock>,
    inner: Mutex<Document>,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("id", &self.id)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Creates `<base>/<id>/` and saves the initial state.
    ///
    /// When `repo_path` is `None` the repository is expected to be cloned
    /// into `<base>/<id>/repo`.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkspaceError`] if the directory or state file cannot be written.
    pub fn create(
        name: &str,
        repo_url: &str,
        repo_path: Option<PathBuf>,
        config: &WorkspaceConfig,
        ctx: &ServiceContext,
    ) -> Result<Self, WorkspaceError> {
        let id: String = ctx.id_gen.generate_id().chars().filter(|c| *c != '-').take(8).collect();
        let root = config.base_dir.join(&id);
        fs::create_dir_all(&root)
            .map_err(|source| WorkspaceError::CreateDir { path: root.clone(), source })?;

        let now = ctx.clock.now();
        let meta = WorkspaceMeta {
            id: id.clone(),
            name: name.to_string(),
            repo_url: repo_url.to_string(),
            repo_path: repo_path.unwrap_or_else(|| root.join("repo")),
            branch: String::new(),
            base_branch: String::new(),
            commit_sha: String::new(),
            language: Language::Unknown,
            created_at: now,
            updated_at: now,
        };

        let ws = Self {
            id,
            root,
            clock: Arc::clone(&ctx.clock),
            inner: Mutex::new(Document { meta, state: WorkspaceState::default() }),
        };
        ws.save()?;
        debug!(workspace = %ws.id, root = %ws.root.display(), "created workspace");
        Ok(ws)
    }

    /// Loads the workspace stored in `dir`.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkspaceError`] if `workspace.json` is missing or invalid.
    pub fn load(dir: &Path, ctx: &ServiceContext) -> Result<Self, WorkspaceError> {
        let path = dir.join(STATE_FILE);
        let raw =
            fs::read(&path).map_err(|source| WorkspaceError::Read { path: path.clone(), source })?;
        let doc: Document = serde_json::from_slice(&raw)
            .map_err(|source| WorkspaceError::Parse { path, source })?;
        Ok(Self {
            id: doc.meta.id.clone(),
            root: dir.to_path_buf(),
            clock: Arc::clone(&ctx.clock),
            inner: Mutex::new(doc),
        })
    }

    /// Loads `<base>/<id>`.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkspaceError`] if the workspace does not exist or is invalid.
    pub fn load_by_id(
        id: &str,
        config: &WorkspaceConfig,
        ctx: &ServiceContext,
    ) -> Result<Self, WorkspaceError> {
        Self::load(&config.base_dir.join(id), ctx)
    }

    /// Loads every readable workspace under the base directory, oldest first.
    ///
    /// Unreadable entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkspaceError`] if the base directory exists but cannot be listed.
    pub fn list(
        config: &WorkspaceConfig,
        ctx: &ServiceContext,
    ) -> Result<Vec<Self>, WorkspaceError> {
        let entries = match fs::read_dir(&config.base_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(WorkspaceError::Read { path: config.base_dir.clone(), source });
            }
        };

        let mut workspaces: Vec<Self> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|e| match Self::load(&e.path(), ctx) {
                Ok(ws) => Some(ws),
                Err(err) => {
                    debug!(
                        path = %e.path().display(),
                        error = %err,
                        "skipping unreadable workspace"
                    );
                    None
                }
            })
            .collect();
        workspaces.sort_by_key(|ws| ws.meta().created_at);
        Ok(workspaces)
    }

    /// Persists the whole document atomically.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkspaceError`] if serialization, writing or renaming fails.
    pub fn save(&self) -> Result<(), WorkspaceError> {
        let data = {
            let mut doc = self.lock();
            doc.meta.updated_at = self.clock.now();
            serde_json::to_vec_pretty(&*doc).map_err(WorkspaceError::Serialize)?
        };

        let tmp = self.root.join(STATE_TMP);
        let path = self.root.join(STATE_FILE);
        fs::write(&tmp, data)
            .map_err(|source| WorkspaceError::Write { path: tmp.clone(), source })?;
        fs::rename(&tmp, &path).map_err(|source| WorkspaceError::Write { path, source })
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Workspace ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Workspace root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/artifacts`.
    #[must_use]
    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    /// `<root>/scratch`, for raw tool output.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join("scratch")
    }

    /// Copy of the metadata.
    #[must_use]
    pub fn meta(&self) -> WorkspaceMeta {
        self.lock().meta.clone()
    }

    /// Local repository checkout.
    #[must_use]
    pub fn repo_path(&self) -> PathBuf {
        self.lock().meta.repo_path.clone()
    }

    /// Detected language.
    #[must_use]
    pub fn language(&self) -> Language {
        self.lock().meta.language
    }

    /// Records the detected language.
    pub fn set_language(&self, language: Language) {
        self.lock().meta.language = language;
    }

    /// Records the commit targets were discovered at.
    pub fn set_commit_sha(&self, sha: &str) {
        self.lock().meta.commit_sha = sha.to_string();
    }

    /// Records the working and base branches.
    pub fn set_branches(&self, branch: &str, base_branch: &str) {
        let mut doc = self.lock();
        doc.meta.branch = branch.to_string();
        doc.meta.base_branch = base_branch.to_string();
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lock().state.phase
    }

    /// Sets the phase.
    pub fn set_phase(&self, phase: Phase) {
        self.lock().state.phase = phase;
    }

    /// Enters `generating`, stamping the start time on the first run.
    pub fn mark_started(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        let mut doc = self.lock();
        doc.state.phase = Phase::Generating;
        *doc.state.started_at.get_or_insert(now)
    }

    /// Enters `paused` and stamps the pause time.
    pub fn mark_paused(&self) {
        let now = self.clock.now();
        let mut doc = self.lock();
        doc.state.phase = Phase::Paused;
        doc.state.paused_at = Some(now);
    }

    /// Adds one pending target per exported function not already known.
    ///
    /// Returns the number of targets inserted.
    pub fn add_targets(&self, functions: &[ParsedFunction], file: &str) -> usize {
        let mut doc = self.lock();
        let mut added = 0;
        for func in functions.iter().filter(|f| f.exported) {
            let id = func
                .id
                .clone()
                .unwrap_or_else(|| format!("{file}:{}:{}", func.start_line, func.name));
            if doc.state.targets.contains_key(&id) {
                continue;
            }
            let kind = if func.class.is_some() { TargetKind::Method } else { TargetKind::Function };
            let target = TargetState::pending(id.clone(), file, &func.name, kind, func.start_line);
            doc.state.targets.insert(id, target);
            doc.state.total_targets += 1;
            added += 1;
        }
        added
    }

    /// Adds a target for a coverage gap, returning its ID.
    ///
    /// Adding the same gap twice is a no-op.
    pub fn add_gap_target(&self, gap: &CoverageGap) -> String {
        let id = gap.target_id();
        let mut doc = self.lock();
        if !doc.state.targets.contains_key(&id) {
            let name = if gap.name.is_empty() {
                format!("lines {}-{}", gap.start_line, gap.end_line)
            } else {
                gap.name.clone()
            };
            let target =
                TargetState::pending(id.clone(), &gap.file, &name, TargetKind::Gap, gap.start_line);
            doc.state.targets.insert(id.clone(), target);
            doc.state.total_targets += 1;
        }
        id
    }

    /// Returns the first pending target in ID order.
    #[must_use]
    pub fn next_target(&self) -> Option<TargetState> {
        self.lock().state.targets.values().find(|t| t.status == TargetStatus::Pending).cloned()
    }

    /// Returns a copy of one target.
    #[must_use]
    pub fn target(&self, id: &str) -> Option<TargetState> {
        self.lock().state.targets.get(id).cloned()
    }

    /// Moves a target to a new status, keeping the counters consistent.
    ///
    /// Counters only change when a target enters a terminal status from a
    /// non-terminal one. A failed target may go back to `pending` or
    /// `running` (a retry), which decrements `failed`. Any other update of a
    /// terminal target is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::UnknownTarget`] or [`WorkspaceError::AlreadyTerminal`].
    pub fn update_target(
        &self,
        id: &str,
        update: TargetUpdate,
    ) -> Result<Transition, WorkspaceError> {
        let now = self.clock.now();
        let mut doc = self.lock();
        let state = &mut doc.state;
        let target = state
            .targets
            .get_mut(id)
            .ok_or_else(|| WorkspaceError::UnknownTarget(id.to_string()))?;

        let from = target.status;
        let to = update.status;
        let retry = from == TargetStatus::Failed
            && matches!(to, TargetStatus::Pending | TargetStatus::Running);
        if from.is_terminal() && !retry {
            return Err(WorkspaceError::AlreadyTerminal { id: id.to_string(), status: from });
        }

        target.status = to;
        if retry {
            target.error = None;
        }
        if let Some(file) = update.test_file {
            target.test_file = Some(file);
        }
        if let Some(error) = update.error {
            target.error = Some(error);
        }
        if to.is_terminal() {
            target.generated_at = Some(now);
        }

        if retry {
            state.failed = state.failed.saturating_sub(1);
        }
        match to {
            TargetStatus::Completed => state.completed += 1,
            TargetStatus::Failed => state.failed += 1,
            TargetStatus::Skipped => state.skipped += 1,
            TargetStatus::Pending | TargetStatus::Running => {}
        }

        Ok(Transition { from, to })
    }

    /// Stores the generated spec on a target.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::UnknownTarget`] if the ID is not known.
    pub fn mark_spec_generated(
        &self,
        id: &str,
        spec_id: &str,
        spec: serde_json::Value,
    ) -> Result<(), WorkspaceError> {
        self.with_target(id, |t| {
            t.spec_id = Some(spec_id.to_string());
            t.spec = Some(spec);
        })
    }

    /// Flags a target as covered by the test suite.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::UnknownTarget`] if the ID is not known.
    pub fn mark_covered(&self, id: &str) -> Result<(), WorkspaceError> {
        self.with_target(id, |t| t.covered = true)
    }

    /// Records the commit containing a target's test.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::UnknownTarget`] if the ID is not known.
    pub fn set_commit(&self, id: &str, sha: &str) -> Result<(), WorkspaceError> {
        self.with_target(id, |t| t.commit_sha = Some(sha.to_string()))
    }

    fn with_target(
        &self,
        id: &str,
        f: impl FnOnce(&mut TargetState),
    ) -> Result<(), WorkspaceError> {
        let mut doc = self.lock();
        let target = doc
            .state
            .targets
            .get_mut(id)
            .ok_or_else(|| WorkspaceError::UnknownTarget(id.to_string()))?;
        f(target);
        Ok(())
    }

    /// Returns targets stranded in `running` by a crash to `pending`.
    pub fn reset_running(&self) -> usize {
        let mut doc = self.lock();
        let mut reset = 0;
        for target in doc.state.targets.values_mut().filter(|t| t.status == TargetStatus::Running) {
            target.status = TargetStatus::Pending;
            reset += 1;
        }
        if reset > 0 {
            warn!(workspace = %self.id, count = reset, "reset targets interrupted mid-generation");
        }
        reset
    }

    /// Returns every failed target to `pending`.
    pub fn retry_failed(&self) -> usize {
        let mut doc = self.lock();
        let mut retried = 0;
        for target in doc.state.targets.values_mut().filter(|t| t.status == TargetStatus::Failed) {
            target.status = TargetStatus::Pending;
            target.error = None;
            retried += 1;
        }
        doc.state.failed = doc.state.failed.saturating_sub(retried);
        retried
    }

    /// Percentage of targets in a terminal status.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        let doc = self.lock();
        let s = &doc.state;
        if s.total_targets == 0 {
            return 0.0;
        }
        (s.completed + s.failed + s.skipped) as f64 / s.total_targets as f64 * 100.0
    }

    /// Counts and progress for display.
    #[must_use]
    pub fn summary(&self) -> WorkspaceSummary {
        let progress = self.progress();
        let doc = self.lock();
        let s = &doc.state;
        WorkspaceSummary {
            id: doc.meta.id.clone(),
            name: doc.meta.name.clone(),
            phase: s.phase,
            total: s.total_targets,
            completed: s.completed,
            failed: s.failed,
            skipped: s.skipped,
            pending: s.pending(),
            progress: format!("{progress:.1}%"),
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> WorkspaceState {
        self.lock().state.clone()
    }
}
