//! Source parser port: extracts function metadata from a file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::PortError;
use crate::model::Language;

/// A function or method found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFunction {
    /// Parser-assigned identifier; the workspace derives one when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Declared name.
    pub name: String,
    /// First line (1-based).
    pub start_line: u32,
    /// Last line (inclusive).
    pub end_line: u32,
    /// Whether the function is publicly visible.
    pub exported: bool,
    /// Enclosing class or receiver, for methods.
    #[serde(default)]
    pub class: Option<String>,
}

/// A class (or struct with methods) found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedClass {
    /// Declared name.
    pub name: String,
    /// First line (1-based).
    pub start_line: u32,
    /// Last line (inclusive).
    pub end_line: u32,
    /// Whether the class is publicly visible.
    pub exported: bool,
}

/// Everything the parser extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    /// Language the file was parsed as.
    pub language: Language,
    /// Functions and methods.
    pub functions: Vec<ParsedFunction>,
    /// Classes.
    pub classes: Vec<ParsedClass>,
}

/// Extracts function signatures from source text.
pub trait SourceParser: Send + Sync {
    /// Parses `source` (the contents of `path`) as `language`.
    ///
    /// # Errors
    ///
    /// Returns an error if the language is unsupported or the source cannot be parsed.
    fn parse(&self, path: &Path, source: &str, language: Language) -> Result<ParsedFile, PortError>;
}
