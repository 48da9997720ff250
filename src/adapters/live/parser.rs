//! Line-oriented function discovery using per-language regular expressions.
//!
//! Not a real parser: it finds declarations by pattern and closes them by
//! brace depth (Go, JS/TS, Rust) or indentation (Python). Braces inside
//! string literals can throw the end line off; the start line and name, which
//! are what targets are keyed on, are unaffected.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::Language;
use crate::ports::{ParsedClass, ParsedFile, ParsedFunction, PortError, SourceParser};

/// Discovers functions, methods and classes in Go, Python, JavaScript, TypeScript and Rust.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexSourceParser;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($re).expect("declaration pattern is valid"))
        }
    };
}

pattern!(go_func, r"^func\s+(?:\(\s*\w*\s*\*?\s*(\w+)(?:\[[^\]]*\])?\s*\)\s*)?(\w+)\s*[\[(]");
pattern!(go_type, r"^type\s+(\w+)\s+struct\b");
pattern!(py_def, r"^(\s*)(?:async\s+)?def\s+(\w+)\s*\(");
pattern!(py_class, r"^(\s*)class\s+(\w+)\s*[(:]");
pattern!(js_function, r"^\s*(export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)\s*[<(]");
pattern!(
    js_arrow,
    concat!(
        r"^\s*(export\s+)?(?:const|let|var)\s+(\w+)\s*(?::[^=]+)?=\s*(?:async\s+)?",
        r"(?:function\b|\([^)]*\)\s*(?::[^=]+)?=>|\w+\s*=>)",
    )
);
pattern!(js_class, r"^\s*(export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)");
pattern!(
    js_method,
    concat!(
        r"^\s+(?:(?:public|private|protected|static|async|readonly|override)\s+)*",
        r"(#?\w+)\s*(?:<[^>]*>)?\([^)]*\)\s*(?::\s*[^{]+)?\{\s*$",
    )
);
pattern!(
    rust_fn,
    concat!(
        r"^\s*(pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?",
        r"(?:extern\s+\S+\s+)?fn\s+(\w+)",
    )
);
pattern!(rust_type, r"^\s*(pub(?:\([^)]*\))?\s+)?(?:struct|enum)\s+(\w+)");

const JS_KEYWORDS: [&str; 8] =
    ["if", "for", "while", "switch", "catch", "return", "function", "constructor"];

impl SourceParser for RegexSourceParser {
    fn parse(
        &self,
        path: &Path,
        source: &str,
        language: Language,
    ) -> Result<ParsedFile, PortError> {
        let lines: Vec<&str> = source.lines().collect();
        let (functions, classes) = match language {
            Language::Go => parse_go(&lines),
            Language::Python => parse_python(&lines),
            Language::JavaScript | Language::TypeScript => parse_js(&lines),
            Language::Rust => parse_rust(&lines),
            other => {
                return Err(format!("unsupported language {other} for {}", path.display()).into());
            }
        };
        Ok(ParsedFile { language, functions, classes })
    }
}

fn line_no(idx: usize) -> u32 {
    u32::try_from(idx + 1).unwrap_or(u32::MAX)
}

/// Index of the line closing the first `{` opened at or after `start`.
fn brace_end(lines: &[&str], start: usize) -> usize {
    let mut depth = 0i32;
    let mut opened = false;
    for (idx, line) in lines.iter().enumerate().skip(start) {
        for c in line.chars() {
            match c {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return idx;
        }
        if !opened && idx > start && line.trim_end().ends_with(';') {
            return idx;
        }
    }
    if opened { lines.len().saturating_sub(1) } else { start }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Index of the last non-blank line indented deeper than `indent` after `start`.
fn indent_end(lines: &[&str], start: usize, indent: usize) -> usize {
    let mut end = start;
    for (idx, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= indent {
            break;
        }
        end = idx;
    }
    end
}

fn is_public_go(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn parse_go(lines: &[&str]) -> (Vec<ParsedFunction>, Vec<ParsedClass>) {
    let mut functions = Vec::new();
    let mut classes = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if let Some(caps) = go_func().captures(line) {
            let name = caps[2].to_string();
            functions.push(ParsedFunction {
                id: None,
                exported: is_public_go(&name),
                start_line: line_no(idx),
                end_line: line_no(brace_end(lines, idx)),
                class: caps.get(1).map(|m| m.as_str().to_string()),
                name,
            });
        } else if let Some(caps) = go_type().captures(line) {
            let name = caps[1].to_string();
            classes.push(ParsedClass {
                exported: is_public_go(&name),
                start_line: line_no(idx),
                end_line: line_no(brace_end(lines, idx)),
                name,
            });
        }
    }
    (functions, classes)
}

fn parse_python(lines: &[&str]) -> (Vec<ParsedFunction>, Vec<ParsedClass>) {
    let mut functions = Vec::new();
    let mut classes: Vec<ParsedClass> = Vec::new();
    // (indent, name) of classes enclosing the current line.
    let mut scope: Vec<(usize, String)> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let indent = indent_of(line);
        while scope.last().is_some_and(|(i, _)| indent <= *i) {
            scope.pop();
        }

        if let Some(caps) = py_class().captures(line) {
            let name = caps[2].to_string();
            classes.push(ParsedClass {
                exported: !name.starts_with('_'),
                start_line: line_no(idx),
                end_line: line_no(indent_end(lines, idx, indent)),
                name: name.clone(),
            });
            scope.push((indent, name));
        } else if let Some(caps) = py_def().captures(line) {
            let name = caps[2].to_string();
            let class = scope.last().map(|(_, c)| c.clone());
            // Nested helpers inside functions are not targets.
            let nested = indent > 0 && class.is_none();
            functions.push(ParsedFunction {
                id: None,
                exported: !name.starts_with('_') && !nested,
                start_line: line_no(idx),
                end_line: line_no(indent_end(lines, idx, indent)),
                class,
                name,
            });
        }
    }
    (functions, classes)
}

fn parse_js(lines: &[&str]) -> (Vec<ParsedFunction>, Vec<ParsedClass>) {
    let mut functions = Vec::new();
    let mut classes: Vec<ParsedClass> = Vec::new();
    let mut current_class: Option<(String, bool, usize)> = None;

    for (idx, line) in lines.iter().enumerate() {
        if current_class.as_ref().is_some_and(|(_, _, end)| idx > *end) {
            current_class = None;
        }

        if let Some(caps) = js_class().captures(line) {
            let name = caps[2].to_string();
            let exported = caps.get(1).is_some();
            let end = brace_end(lines, idx);
            classes.push(ParsedClass {
                name: name.clone(),
                start_line: line_no(idx),
                end_line: line_no(end),
                exported,
            });
            current_class = Some((name, exported, end));
            continue;
        }

        let declared = js_function().captures(line).or_else(|| js_arrow().captures(line));
        if let Some(caps) = declared {
            functions.push(ParsedFunction {
                id: None,
                name: caps[2].to_string(),
                start_line: line_no(idx),
                end_line: line_no(brace_end(lines, idx)),
                exported: caps.get(1).is_some(),
                class: None,
            });
            continue;
        }

        if let Some((class, class_exported, _)) = &current_class {
            if let Some(caps) = js_method().captures(line) {
                let name = caps[1].to_string();
                if JS_KEYWORDS.contains(&name.as_str()) {
                    continue;
                }
                functions.push(ParsedFunction {
                    id: None,
                    exported: *class_exported && !name.starts_with(['_', '#']),
                    start_line: line_no(idx),
                    end_line: line_no(brace_end(lines, idx)),
                    class: Some(class.clone()),
                    name,
                });
            }
        }
    }
    (functions, classes)
}

fn parse_rust(lines: &[&str]) -> (Vec<ParsedFunction>, Vec<ParsedClass>) {
    let mut functions = Vec::new();
    let mut classes = Vec::new();
    let mut in_tests = false;
    for (idx, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with("#[cfg(test)]") {
            in_tests = true;
        }
        if let Some(caps) = rust_fn().captures(line) {
            functions.push(ParsedFunction {
                id: None,
                name: caps[2].to_string(),
                start_line: line_no(idx),
                end_line: line_no(brace_end(lines, idx)),
                exported: caps.get(1).is_some() && !in_tests,
                class: None,
            });
        } else if let Some(caps) = rust_type().captures(line) {
            classes.push(ParsedClass {
                name: caps[2].to_string(),
                start_line: line_no(idx),
                end_line: line_no(brace_end(lines, idx)),
                exported: caps.get(1).is_some(),
            });
        }
    }
    (functions, classes)
}
