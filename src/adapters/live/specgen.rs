//! Spec generation by prompting the LLM port for a structured test spec.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::debug;

use crate::model::{SystemModel, TestIntent, TestSpec};
use crate::ports::{CompletionRequest, LlmClient, PortError, SpecFuture, SpecGenerator, Tier};

const MAX_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.2;

const SYSTEM_PROMPT: &str = "You write precise, deterministic unit test specifications. \
    Reply with a single YAML document and nothing else.";

/// Asks the LLM for one YAML test spec per intent.
pub struct LlmSpecGenerator {
    llm: Arc<dyn LlmClient>,
}

impl LlmSpecGenerator {
    /// Creates a generator backed by `llm`.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    async fn request(
        &self,
        intent: &TestIntent,
        model: &SystemModel,
        tier: Tier,
    ) -> Result<TestSpec, PortError> {
        let request = CompletionRequest {
            tier,
            system: Some(SYSTEM_PROMPT.to_string()),
            prompt: build_prompt(intent, model),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };
        debug!(intent = %intent.id, ?tier, "requesting test spec");
        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| format!("LLM spec request failed: {e}"))?;
        parse_spec_response(&response.text, intent)
    }
}

impl SpecGenerator for LlmSpecGenerator {
    fn generate<'a>(
        &'a self,
        intent: &'a TestIntent,
        model: &'a SystemModel,
        tier: Tier,
    ) -> SpecFuture<'a> {
        Box::pin(self.request(intent, model, tier))
    }
}

fn build_prompt(intent: &TestIntent, model: &SystemModel) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Repository: {} ({})", model.repository, model.language);
    let _ = writeln!(prompt, "Target: {} ({})", intent.target_id, intent.target_kind);
    let _ = writeln!(prompt, "Priority: {}", intent.priority.as_str());
    let _ = writeln!(prompt, "Reason: {}", intent.reason);

    if let Some(function) = model.functions.iter().find(|f| f.id == intent.target_id) {
        let _ = writeln!(
            prompt,
            "Function: {} in {} (lines {}-{})",
            function.name, function.file, function.start_line, function.end_line
        );
    }
    if let Some(source) = &intent.source {
        let _ = writeln!(prompt, "\nSource:\n```\n{}\n```", source.trim_end());
    }

    prompt.push_str(
        "\nWrite one test specification as YAML with these fields:\n\
         description: <what the test checks>\n\
         function_name: <function under test, if any>\n\
         inputs: {<arg>: <value>, ...}\n\
         expected: {<name>: <value>, ...}\n\
         assertions:\n  - kind: equals|contains|throws|truthy\n\
         \x20   actual: <expression>\n    expected: <value>\n\
         tags: [<tag>, ...]\n\n\
         Cover the behavior described by the reason. Prefer edge cases over happy paths when the \
         reason mentions uncovered branches.\n",
    );
    prompt
}

/// Removes a surrounding Markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "yaml") on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_spec_response(text: &str, intent: &TestIntent) -> Result<TestSpec, PortError> {
    let body = strip_code_fence(text);
    let mut map: serde_yaml::Mapping =
        serde_yaml::from_str(body).map_err(|e| format!("failed to parse spec response: {e}"))?;
    let id_key = serde_yaml::Value::from("id");
    if !map.contains_key(&id_key) {
        map.insert(id_key, format!("spec-{}", intent.id).into());
    }
    let mut spec: TestSpec = serde_yaml::from_value(serde_yaml::Value::Mapping(map))
        .map_err(|e| format!("failed to parse spec response: {e}"))?;

    if spec.id.is_empty() {
        spec.id = format!("spec-{}", intent.id);
    }
    if spec.target_id.is_empty() {
        spec.target_id.clone_from(&intent.target_id);
    }
    if spec.target_kind.is_empty() {
        spec.target_kind.clone_from(&intent.target_kind);
    }
    spec.level = intent.level;
    spec.priority.get_or_insert(intent.priority);
    Ok(spec)
}
