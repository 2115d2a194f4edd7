//! OpenAI-compatible chat completion adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::ProviderCredentials;
use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, error_for_status, DEFAULT_CALL_TIMEOUT};
use crate::traits::{ChatOptions, ChatOutcome, TextCompletion};

const DEFAULT_BASE_URL: &str = "http://localhost:8101/v1";
const DEFAULT_MODEL: &str = "default";

// Per-unit estimates for upfront cost disclosure (USD per million tokens).
const INPUT_USD_PER_MTOKEN: f64 = 0.50;
const OUTPUT_USD_PER_MTOKEN: f64 = 1.50;

/// Chat adapter for any endpoint speaking the `/chat/completions` shape.
pub struct HttpTextCompletion {
    http: Client,
    base_url: String,
    token: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

impl HttpTextCompletion {
    pub fn new(credentials: &ProviderCredentials) -> ProviderResult<Self> {
        Self::with_timeout(credentials, DEFAULT_CALL_TIMEOUT)
    }

    pub fn with_timeout(
        credentials: &ProviderCredentials,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url: credentials
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            token: credentials.token.clone(),
            model: credentials
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl TextCompletion for HttpTextCompletion {
    async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &ChatOptions,
    ) -> ProviderResult<ChatOutcome> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt,
                },
                Message {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_output.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        debug!(model = %self.model, "sending chat completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(format!("chat response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::malformed("chat response had no choices"))?;

        let usage = parsed.usage;
        Ok(ChatOutcome {
            content,
            input_tokens: usage.as_ref().and_then(|u| u.prompt_tokens),
            output_tokens: usage.as_ref().and_then(|u| u.completion_tokens),
        })
    }

    fn estimate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 / 1_000_000.0 * INPUT_USD_PER_MTOKEN
            + output_tokens as f64 / 1_000_000.0 * OUTPUT_USD_PER_MTOKEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds(server: &MockServer) -> ProviderCredentials {
        ProviderCredentials::new("test-token")
            .with_endpoint(format!("{}/v1", server.uri()))
            .with_model("planner-large")
    }

    #[tokio::test]
    async fn test_chat_parses_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(serde_json::json!({
                "model": "planner-large",
                "response_format": {"type": "json_object"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"ok\":true}"}}],
                "usage": {"prompt_tokens": 1200, "completion_tokens": 900},
            })))
            .mount(&server)
            .await;

        let adapter = HttpTextCompletion::new(&creds(&server)).unwrap();
        let options = ChatOptions {
            json_output: true,
            ..Default::default()
        };
        let outcome = adapter.chat("system", "user", &options).await.unwrap();

        assert_eq!(outcome.content, "{\"ok\":true}");
        assert_eq!(outcome.input_tokens, Some(1200));
        assert_eq!(outcome.output_tokens, Some(900));
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let adapter = HttpTextCompletion::new(&creds(&server)).unwrap();
        let err = adapter
            .chat("s", "u", &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter = HttpTextCompletion::new(&creds(&server)).unwrap();
        let err = adapter
            .chat("s", "u", &ChatOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_cost_estimate() {
        let creds = ProviderCredentials::new("t");
        let adapter = HttpTextCompletion::new(&creds).unwrap();
        let cost = adapter.estimate_cost(2000, 2000);
        assert!((cost - 0.004).abs() < 1e-9);
    }
}
