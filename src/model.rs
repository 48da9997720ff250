//! Domain types shared between the drivers and the collaborator ports.
//!
//! A [`TestIntent`] says *what* to test; a [`TestSpec`] is the structured
//! answer produced by a [`SpecGenerator`](crate::ports::SpecGenerator) and
//! rendered by a [`CodeEmitter`](crate::ports::CodeEmitter).

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A source language the engine knows how to discover and collect coverage for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Go.
    Go,
    /// Python.
    Python,
    /// JavaScript.
    JavaScript,
    /// TypeScript.
    TypeScript,
    /// Rust.
    Rust,
    /// Java.
    Java,
    /// Not detected yet, or not supported.
    #[default]
    Unknown,
}

impl Language {
    /// Detects the language from a file extension.
    #[must_use]
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("go") => Self::Go,
            Some("py") => Self::Python,
            Some("js" | "jsx" | "mjs" | "cjs") => Self::JavaScript,
            Some("ts" | "tsx") => Self::TypeScript,
            Some("rs") => Self::Rust,
            Some("java") => Self::Java,
            _ => Self::Unknown,
        }
    }

    /// Parses a user-supplied language name (e.g. from `.qtest.yaml`).
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "go" | "golang" => Self::Go,
            "python" | "py" => Self::Python,
            "javascript" | "js" => Self::JavaScript,
            "typescript" | "ts" => Self::TypeScript,
            "rust" | "rs" => Self::Rust,
            "java" => Self::Java,
            _ => Self::Unknown,
        }
    }

    /// Returns the canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Rust => "rust",
            Self::Java => "java",
            Self::Unknown => "unknown",
        }
    }

    /// Returns `true` once a real language has been detected.
    #[must_use]
    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    /// Detects a project's language from build files at the repository root.
    #[must_use]
    pub fn detect_project(repo: &Path) -> Self {
        const MARKERS: [(&str, Language); 10] = [
            ("go.mod", Language::Go),
            ("tsconfig.json", Language::TypeScript),
            ("package.json", Language::JavaScript),
            ("pyproject.toml", Language::Python),
            ("setup.py", Language::Python),
            ("requirements.txt", Language::Python),
            ("Cargo.toml", Language::Rust),
            ("pom.xml", Language::Java),
            ("build.gradle", Language::Java),
            ("build.gradle.kts", Language::Java),
        ];
        MARKERS
            .iter()
            .find(|(marker, _)| repo.join(marker).is_file())
            .map_or(Self::Unknown, |&(_, language)| language)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test pyramid level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestLevel {
    /// Unit test against a single function.
    #[default]
    Unit,
    /// Test through an API surface.
    Api,
    /// End-to-end test.
    E2e,
}

/// Priority tier attached to a coverage gap and carried into its intent.
///
/// Ordered so that `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Nice to have.
    #[default]
    Low,
    /// Worth covering.
    Medium,
    /// Should be covered soon.
    High,
    /// Cover first.
    Critical,
}

impl Priority {
    /// Numeric rank, higher is more urgent.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// Lowercase name as written in artifacts.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// What kind of region a coverage gap covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapKind {
    /// A parsed function whose body is mostly uncovered.
    Function,
    /// A contiguous run of uncovered lines.
    Block,
    /// A whole file with no line-level detail.
    File,
}

impl GapKind {
    /// Lowercase name as written in intents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Block => "block",
            Self::File => "file",
        }
    }
}

/// A contiguous uncovered region of a file, ranked by priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageGap {
    /// File path relative to the repository root.
    pub file: String,
    /// First uncovered line (1-based).
    pub start_line: u32,
    /// Last uncovered line (inclusive).
    pub end_line: u32,
    /// Kind of region.
    pub kind: GapKind,
    /// Function name or a short label for the region.
    #[serde(default)]
    pub name: String,
    /// Priority tier.
    pub priority: Priority,
    /// Why the gap was reported.
    pub reason: String,
}

impl CoverageGap {
    /// Stable identifier for the gap, also used as its workspace target ID.
    #[must_use]
    pub fn target_id(&self) -> String {
        format!("{}:{}:{}", self.file, self.start_line, self.kind.as_str())
    }

    /// Number of lines spanned by the gap.
    #[must_use]
    pub fn line_count(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// What to test at which level; the input to spec generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestIntent {
    /// Intent identifier.
    pub id: String,
    /// Test pyramid level.
    pub level: TestLevel,
    /// `"function"`, `"block"` or `"file"`.
    pub target_kind: String,
    /// Identifier of the target inside the system model.
    pub target_id: String,
    /// Priority tier.
    pub priority: Priority,
    /// Why this test is needed.
    pub reason: String,
    /// Source excerpt the generator should test against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A function known to the system model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFunction {
    /// Function identifier.
    pub id: String,
    /// Declared name.
    pub name: String,
    /// File containing the function.
    pub file: String,
    /// First line.
    pub start_line: u32,
    /// Last line.
    pub end_line: u32,
    /// Whether the function is publicly visible.
    pub exported: bool,
}

/// Minimal description of the system under test handed to the spec generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemModel {
    /// Model identifier.
    pub id: String,
    /// Repository name or URL.
    pub repository: String,
    /// Primary language.
    pub language: Language,
    /// Known functions.
    #[serde(default)]
    pub functions: Vec<ModelFunction>,
}

/// A single assertion inside a test spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    /// Assertion kind (`equals`, `contains`, `throws`, ...).
    pub kind: String,
    /// Expression under test.
    #[serde(default)]
    pub actual: String,
    /// Expected value.
    #[serde(default)]
    pub expected: serde_json::Value,
}

/// Structured test specification produced by the spec generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    /// Spec identifier.
    pub id: String,
    /// Test pyramid level.
    #[serde(default)]
    pub level: TestLevel,
    /// Kind of target the spec exercises.
    #[serde(default)]
    pub target_kind: String,
    /// Target identifier.
    #[serde(default)]
    pub target_id: String,
    /// Human-readable description of the test.
    #[serde(default)]
    pub description: String,
    /// Function under test, when the target is a function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    /// Function arguments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, serde_json::Value>,
    /// Expected outcome values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expected: BTreeMap<String, serde_json::Value>,
    /// Assertions to render.
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Priority inherited from the intent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_language_from_extension() {
        assert_eq!(Language::detect(Path::new("pkg/main.go")), Language::Go);
        assert_eq!(Language::detect(Path::new("app/views.py")), Language::Python);
        assert_eq!(Language::detect(Path::new("src/index.tsx")), Language::TypeScript);
        assert_eq!(Language::detect(Path::new("README")), Language::Unknown);
    }

    #[test]
    fn detects_project_language_from_markers() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Language::detect_project(dir.path()), Language::Unknown);

        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(Language::detect_project(dir.path()), Language::JavaScript);

        std::fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();
        assert_eq!(Language::detect_project(dir.path()), Language::TypeScript);

        std::fs::write(dir.path().join("go.mod"), "module calc\n").unwrap();
        assert_eq!(Language::detect_project(dir.path()), Language::Go);
    }

    #[test]
    fn priority_orders_critical_first() {
        let mut tiers = vec![Priority::Low, Priority::Critical, Priority::Medium, Priority::High];
        tiers.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            tiers,
            vec![Priority::Critical, Priority::High, Priority::Medium, Priority::Low]
        );
    }

    #[test]
    fn spec_tolerates_missing_optional_fields() {
        let spec: TestSpec = serde_yaml::from_str("id: t1\ndescription: adds numbers\n").unwrap();
        assert_eq!(spec.id, "t1");
        assert_eq!(spec.level, TestLevel::Unit);
        assert!(spec.assertions.is_empty());
    }

    #[test]
    fn gap_target_id_is_stable() {
        let gap = CoverageGap {
            file: "pkg/main.go".into(),
            start_line: 10,
            end_line: 15,
            kind: GapKind::Block,
            name: String::new(),
            priority: Priority::Low,
            reason: "uncovered".into(),
        };
        assert_eq!(gap.target_id(), "pkg/main.go:10:block");
        assert_eq!(gap.line_count(), 6);
    }
}
