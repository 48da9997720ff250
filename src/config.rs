//! Process configuration from the environment and per-repository `.qtest.yaml`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::Language;
use crate::ports::Tier;
use crate::workspace::WorkspaceConfig;

/// Default model per tier when no override is set.
pub const DEFAULT_FAST_MODEL: &str = "claude-3-5-haiku-latest";
/// Default balanced-tier model.
pub const DEFAULT_BALANCED_MODEL: &str = "claude-sonnet-4-5";
/// Default thorough-tier model.
pub const DEFAULT_THOROUGH_MODEL: &str = "claude-opus-4-1";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Neither `QTEST_HOME` nor `HOME` is set.
    #[error("cannot locate workspaces: set QTEST_HOME or HOME")]
    NoHome,

    /// The project config exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The project config is not valid YAML for the expected shape.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Config path.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: serde_yaml::Error,
    },
}

/// Settings read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory holding all workspaces.
    pub home: PathBuf,
    /// Model used for [`Tier::Fast`].
    pub fast_model: String,
    /// Model used for [`Tier::Balanced`].
    pub balanced_model: String,
    /// Model used for [`Tier::Thorough`].
    pub thorough_model: String,
    /// Directory to record session cassettes into, when set.
    pub record_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Reads `QTEST_HOME`, `QTEST_MODEL_*` and `QTEST_RECORD`.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] if no base directory can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    /// Builds the config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] if no base directory can be determined.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let home = match lookup("QTEST_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(lookup("HOME").ok_or(ConfigError::NoHome)?)
                .join(".qtest")
                .join("workspaces"),
        };
        Ok(Self {
            home,
            fast_model: lookup("QTEST_MODEL_FAST")
                .unwrap_or_else(|| DEFAULT_FAST_MODEL.to_string()),
            balanced_model: lookup("QTEST_MODEL_BALANCED")
                .unwrap_or_else(|| DEFAULT_BALANCED_MODEL.to_string()),
            thorough_model: lookup("QTEST_MODEL_THOROUGH")
                .unwrap_or_else(|| DEFAULT_THOROUGH_MODEL.to_string()),
            record_dir: lookup("QTEST_RECORD").map(PathBuf::from),
        })
    }

    /// Model name for `tier`.
    #[must_use]
    pub fn model_for(&self, tier: Tier) -> &str {
        match tier {
            Tier::Fast => &self.fast_model,
            Tier::Balanced => &self.balanced_model,
            Tier::Thorough => &self.thorough_model,
        }
    }

    /// Workspace location derived from [`Self::home`].
    #[must_use]
    pub fn workspace_config(&self) -> WorkspaceConfig {
        WorkspaceConfig::new(&self.home)
    }
}

/// Per-repository settings from `.qtest.yaml` / `.qtest.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Config schema version.
    pub version: String,
    /// Language override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Generation preferences.
    pub generation: GenerationConfig,
    /// Source files to consider.
    pub include: Vec<String>,
    /// Source files to ignore.
    pub exclude: Vec<String>,
    /// Test framework preferences.
    pub framework: FrameworkConfig,
    /// Coverage settings.
    pub coverage: CoverageSettings,
}

/// Generation preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Model tier (1, 2 or 3).
    pub tier: u8,
    /// `standard`, `table-driven` or `bdd`.
    pub style: String,
    /// Upper bound on tests per function.
    pub max_tests_per_function: u32,
    /// Generate edge-case tests.
    pub edge_cases: bool,
    /// Generate error-path tests.
    pub error_paths: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            tier: 2,
            style: "standard".to_string(),
            max_tests_per_function: 5,
            edge_cases: true,
            error_paths: true,
        }
    }
}

/// Test framework preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Framework name (`go`, `pytest`, `jest`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Suffix for generated test files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_file_suffix: Option<String>,
    /// Directory for generated tests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_dir: Option<String>,
}

/// Coverage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageSettings {
    /// Target coverage percentage.
    pub threshold: f64,
    /// Files to leave out of coverage analysis.
    pub exclude: Vec<String>,
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self { threshold: 80.0, exclude: Vec::new() }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            language: None,
            generation: GenerationConfig::default(),
            include: ["**/*.go", "**/*.py", "**/*.ts", "**/*.js"].map(String::from).to_vec(),
            exclude: [
                "**/vendor/**",
                "**/node_modules/**",
                "**/*_test.go",
                "**/test_*.py",
                "**/*.test.ts",
                "**/*.test.js",
            ]
            .map(String::from)
            .to_vec(),
            framework: FrameworkConfig::default(),
            coverage: CoverageSettings::default(),
        }
    }
}

impl ProjectConfig {
    /// File names checked, in order.
    pub const FILE_NAMES: [&'static str; 2] = [".qtest.yaml", ".qtest.yml"];

    /// Loads the project config from `repo`, falling back to defaults when absent.
    ///
    /// Fields missing from the file keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a config file exists but cannot be read or parsed.
    pub fn load(repo: &Path) -> Result<Self, ConfigError> {
        let Some(path) = Self::FILE_NAMES.iter().map(|n| repo.join(n)).find(|p| p.is_file()) else {
            debug!(repo = %repo.display(), "no project config, using defaults");
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(&path)
            .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Language override, if one is set and recognized.
    #[must_use]
    pub fn language(&self) -> Option<Language> {
        self.language.as_deref().map(Language::from_name).filter(|l| l.is_known())
    }

    /// Model tier from `generation.tier`, if valid.
    #[must_use]
    pub fn tier(&self) -> Option<Tier> {
        Tier::from_level(self.generation.tier)
    }
}

/// Shell-style path pattern (`*`, `?`, `[..]`, `**`).
///
/// A pattern without `/` matches against the file name only.
#[derive(Debug, Clone)]
pub struct PathPattern {
    pattern: Pattern,
    basename_only: bool,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl PathPattern {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the glob error if the pattern is malformed.
    pub fn new(pattern: &str) -> Result<Self, glob::PatternError> {
        Ok(Self { pattern: Pattern::new(pattern)?, basename_only: !pattern.contains('/') })
    }

    /// Tests a `/`-separated path relative to the repository root.
    #[must_use]
    pub fn matches(&self, relative: &str) -> bool {
        let candidate = if self.basename_only {
            relative.rsplit('/').next().unwrap_or(relative)
        } else {
            relative
        };
        self.pattern.matches_with(candidate, MATCH_OPTIONS)
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Compiles every pattern, skipping (and logging) invalid ones.
#[must_use]
pub fn compile_patterns(patterns: &[String]) -> Vec<PathPattern> {
    patterns
        .iter()
        .filter_map(|p| match PathPattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!(pattern = %p, error = %e, "ignoring invalid path pattern");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn home_defaults_under_user_home() {
        let cfg = AppConfig::from_lookup(lookup(&[("HOME", "/home/dev")])).unwrap();
        assert_eq!(cfg.home, PathBuf::from("/home/dev/.qtest/workspaces"));
        assert_eq!(cfg.model_for(Tier::Balanced), DEFAULT_BALANCED_MODEL);
        assert!(cfg.record_dir.is_none());
    }

    #[test]
    fn explicit_settings_win() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("HOME", "/home/dev"),
            ("QTEST_HOME", "/data/qtest"),
            ("QTEST_MODEL_FAST", "tiny"),
            ("QTEST_RECORD", "/tmp/cassettes"),
        ]))
        .unwrap();
        assert_eq!(cfg.workspace_config().base_dir, PathBuf::from("/data/qtest"));
        assert_eq!(cfg.model_for(Tier::Fast), "tiny");
        assert_eq!(cfg.record_dir, Some(PathBuf::from("/tmp/cassettes")));
    }

    #[test]
    fn missing_home_is_an_error() {
        assert!(matches!(AppConfig::from_lookup(lookup(&[])), Err(ConfigError::NoHome)));
    }

    #[test]
    fn absent_project_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(cfg, ProjectConfig::default());
        assert_eq!(cfg.tier(), Some(Tier::Balanced));
        assert!((cfg.coverage.threshold - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_project_config_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".qtest.yml"),
            "language: python\ngeneration:\n  tier: 3\nframework:\n  test_dir: tests/unit\n",
        )
        .unwrap();

        let cfg = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.language(), Some(Language::Python));
        assert_eq!(cfg.tier(), Some(Tier::Thorough));
        assert_eq!(cfg.generation.style, "standard");
        assert_eq!(cfg.framework.test_dir.as_deref(), Some("tests/unit"));
        assert_eq!(cfg.include.len(), 4);
    }

    #[test]
    fn yaml_takes_precedence_over_yml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".qtest.yaml"), "language: go\n").unwrap();
        fs::write(dir.path().join(".qtest.yml"), "language: python\n").unwrap();
        assert_eq!(ProjectConfig::load(dir.path()).unwrap().language(), Some(Language::Go));
    }

    #[test]
    fn invalid_project_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".qtest.yaml"), "generation: [1, 2\n").unwrap();
        assert!(matches!(ProjectConfig::load(dir.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn path_patterns() {
        let go = PathPattern::new("**/*.go").unwrap();
        assert!(go.matches("main.go"));
        assert!(go.matches("pkg/api/server.go"));
        assert!(!go.matches("main.py"));

        let vendor = PathPattern::new("**/vendor/**").unwrap();
        assert!(vendor.matches("vendor/lib/x.go"));
        assert!(vendor.matches("a/vendor/x.go"));
        assert!(!vendor.matches("vendored.go"));

        let bare = PathPattern::new("*.ts").unwrap();
        assert!(bare.matches("src/app/index.ts"));
        assert!(!bare.matches("src/app/index.tsx"));

        let tests = PathPattern::new("**/test_*.py").unwrap();
        assert!(tests.matches("test_api.py"));
        assert!(tests.matches("pkg/test_api.py"));
    }

    #[test]
    fn single_star_stays_within_a_directory() {
        let top = PathPattern::new("src/*.go").unwrap();
        assert!(top.matches("src/main.go"));
        assert!(!top.matches("src/api/server.go"));
    }

    #[test]
    fn character_classes_match() {
        let class = PathPattern::new("src/[ab]*.go").unwrap();
        assert!(class.matches("src/a.go"));
        assert!(class.matches("src/beta.go"));
        assert!(!class.matches("src/c.go"));
        assert_eq!(class.as_str(), "src/[ab]*.go");
    }

    #[test]
    fn malformed_patterns_are_dropped() {
        let compiled = compile_patterns(&["**/*.go".to_string(), "src/[ab.go".to_string()]);
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].as_str(), "**/*.go");
    }
}
