//! Live adapters for real external interactions.

pub mod clock;
pub mod emitter;
pub mod git;
pub mod id_gen;
pub mod llm;
pub mod parser;
pub mod shell;
pub mod specgen;
