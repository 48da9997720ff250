//! Live adapter for the `LlmClient` port using the Anthropic messages API.

use std::env;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::ports::{
    CompletionFuture, CompletionRequest, CompletionResponse, LlmClient, PortError, Tier,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_ATTEMPTS: u32 = 3;

/// Calls the Anthropic messages API, mapping each tier to a configured model.
///
/// Rate limits and server errors are retried with exponential backoff.
pub struct LiveLlmClient {
    client: Client,
    models: [String; 3],
}

impl LiveLlmClient {
    /// Creates a client using the tier→model mapping from `config`.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            models: [
                config.fast_model.clone(),
                config.balanced_model.clone(),
                config.thorough_model.clone(),
            ],
        }
    }

    fn model(&self, tier: Tier) -> &str {
        &self.models[usize::from(tier.level() - 1)]
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [AnthropicMessage<'a>; 1],
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

fn retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

impl LiveLlmClient {
    async fn send(&self, request: CompletionRequest) -> Result<CompletionResponse, PortError> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .map_err(|_| PortError::from("ANTHROPIC_API_KEY environment variable not set"))?;
        let model = self.model(request.tier);
        let body = AnthropicRequest {
            model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.as_deref(),
            messages: [AnthropicMessage { role: "user", content: &request.prompt }],
        };

        let mut attempt = 0;
        let (status, text) = loop {
            attempt += 1;
            debug!(model, attempt, "sending completion request");
            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
                .send()
                .await
                .map_err(|e| format!("Anthropic API request failed: {e}"))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| format!("Failed to read Anthropic API response: {e}"))?;
            if retryable(status) && attempt < MAX_ATTEMPTS {
                let wait = Duration::from_secs(2u64.pow(attempt));
                warn!(
                    status = status.as_u16(),
                    attempt,
                    wait_secs = wait.as_secs(),
                    "retrying completion"
                );
                tokio::time::sleep(wait).await;
                continue;
            }
            break (status, text);
        };

        if !status.is_success() {
            let msg = serde_json::from_str::<AnthropicError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(format!("Anthropic API error ({}): {msg}", status.as_u16()).into());
        }

        let api_response: AnthropicResponse = serde_json::from_str(&text)
            .map_err(|e| format!("Failed to parse Anthropic API response: {e}"))?;
        Ok(CompletionResponse {
            text: api_response.content.into_iter().map(|block| block.text).collect(),
            prompt_tokens: api_response.usage.input_tokens,
            completion_tokens: api_response.usage.output_tokens,
        })
    }
}

impl LlmClient for LiveLlmClient {
    fn complete(&self, request: &CompletionRequest) -> CompletionFuture<'_> {
        Box::pin(self.send(request.clone()))
    }
}
