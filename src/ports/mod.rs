//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the generation engine and an
//! external collaborator (time, IDs, shell, version control, LLM, source
//! parsing, spec generation, code rendering, gap analysis).
//! Implementations live in `src/adapters/`.

pub mod analyzer;
pub mod clock;
pub mod emitter;
pub mod git;
pub mod id_gen;
pub mod llm;
pub mod parser;
pub mod shell;
pub mod specgen;

pub use analyzer::GapAnalyzer;
pub use clock::Clock;
pub use emitter::{CodeEmitter, EmittedCode};
pub use git::VersionControl;
pub use id_gen::IdGenerator;
pub use llm::{CompletionFuture, CompletionRequest, CompletionResponse, LlmClient, Tier};
pub use parser::{ParsedClass, ParsedFile, ParsedFunction, SourceParser};
pub use shell::{CommandSpec, ShellExecutor, ShellOutput};
pub use specgen::{SpecFuture, SpecGenerator};

/// Error type returned across every port boundary.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;
