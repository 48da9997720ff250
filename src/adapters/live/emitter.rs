//! Language-neutral emitter that writes specs as a YAML test suite.
//!
//! Downstream, per-language renderers consume these files; keeping the
//! emitted form declarative lets one suite drive several test frameworks.

use serde::Serialize;

use crate::model::TestSpec;
use crate::ports::{CodeEmitter, EmittedCode, PortError};

/// Serializes specs under a top-level `tests:` key.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlSpecEmitter;

#[derive(Serialize)]
struct Suite<'a> {
    tests: &'a [TestSpec],
}

impl CodeEmitter for YamlSpecEmitter {
    fn name(&self) -> &str {
        "yaml"
    }

    fn emit(&self, specs: &[TestSpec]) -> Result<EmittedCode, PortError> {
        if specs.is_empty() {
            return Err("nothing to emit".into());
        }
        let body = serde_yaml::to_string(&Suite { tests: specs })?;
        Ok(EmittedCode {
            source: format!("# Generated by qtest.\n{body}"),
            extension: ".yaml".into(),
        })
    }

    /// Starts a new YAML document, so an appended suite keeps its own `tests:` key.
    fn section_break(&self, label: &str) -> String {
        format!("--- # {label}")
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    fn spec(id: &str) -> TestSpec {
        let yaml = format!("id: {id}\ndescription: checks {id}\nfunction_name: Add\n");
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn emits_suite_with_header() {
        let code = YamlSpecEmitter.emit(&[spec("a"), spec("b")]).unwrap();
        assert_eq!(code.extension, ".yaml");
        assert!(code.source.starts_with("# Generated by qtest.\ntests:\n"));

        let parsed: serde_yaml::Value = serde_yaml::from_str(&code.source).unwrap();
        assert_eq!(parsed["tests"][1]["id"], serde_yaml::Value::from("b"));
        assert_eq!(parsed["tests"][0]["function_name"], serde_yaml::Value::from("Add"));
    }

    #[test]
    fn appended_suites_stay_separate_documents() {
        let first = YamlSpecEmitter.emit(&[spec("a")]).unwrap().source;
        let second = YamlSpecEmitter.emit(&[spec("b")]).unwrap().source;
        let file = format!("{first}{}\n{second}", YamlSpecEmitter.section_break("tests for b"));

        let ids: Vec<serde_yaml::Value> = serde_yaml::Deserializer::from_str(&file)
            .map(|doc| serde_yaml::Value::deserialize(doc).unwrap()["tests"][0]["id"].clone())
            .collect();
        assert_eq!(ids, [serde_yaml::Value::from("a"), serde_yaml::Value::from("b")]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(YamlSpecEmitter.emit(&[]).is_err());
    }
}
