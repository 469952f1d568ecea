//! Anthropic Messages API client.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use answerkey_core::traits::{GenerateRequest, GenerateResponse, LlmProvider};

use crate::error::{build_client, check_status, decode_json, transport_error, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Anthropic API provider.
pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, base_url: Option<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: api_key.trim().to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: build_client()?,
        })
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let start = Instant::now();

        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system_prompt.as_deref(),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, &request.model).await?;
        let api_response: MessagesResponse = decode_json(response).await?;

        // Text blocks are concatenated; other block kinds carry no text.
        let content: String = api_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(GenerateResponse {
            content,
            model: api_response.model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "claude-sonnet-4-20250514".into(),
            prompt: "Grade these answers".into(),
            system_prompt: Some("You are an exam grader.".into()),
            max_tokens: 1024,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn successful_generation() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "content": [{"type": "text", "text": "```json\n{\"scores\": {\"q1\": 10}}\n```"}],
            "model": "claude-sonnet-4-20250514",
            "usage": {"input_tokens": 50, "output_tokens": 20}
        });

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(serde_json::json!({
                "system": "You are an exam grader."
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("test-key", Some(server.uri())).unwrap();
        let response = provider.generate(&request()).await.unwrap();
        assert!(response.content.starts_with("```json"));
        assert_eq!(response.model, "claude-sonnet-4-20250514");
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("bad-key", Some(server.uri())).unwrap();
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
        assert!(err.to_string().contains("authentication"));
    }

    #[tokio::test]
    async fn unknown_model() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("key", Some(server.uri())).unwrap();
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ModelNotFound(ref m) if m == "claude-sonnet-4-20250514"));
    }

    #[tokio::test]
    async fn undecodable_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("key", Some(server.uri())).unwrap();
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status: 0, .. }));
    }
}
