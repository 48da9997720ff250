//! Code emitter port: renders test specs into test source.

use serde::{Deserialize, Serialize};

use super::PortError;
use crate::model::TestSpec;

/// Rendered test source plus the extension its file should carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedCode {
    /// Test source text.
    pub source: String,
    /// File extension including the leading dot (e.g. `".py"`).
    pub extension: String,
}

/// Renders specs into language-specific test code.
pub trait CodeEmitter: Send + Sync {
    /// Short emitter name used in logs.
    fn name(&self) -> &str;

    /// Renders `specs` into one source unit.
    ///
    /// # Errors
    ///
    /// Returns an error if a spec cannot be rendered.
    fn emit(&self, specs: &[TestSpec]) -> Result<EmittedCode, PortError>;

    /// Line placed between sections appended to an existing test file.
    fn section_break(&self, label: &str) -> String {
        format!("# --- {label} ---")
    }
}
