//! `OpenAI` API provider implementation.

use super::common::{
    build_http_client, check_status, convert_role_standard, StandardMessage, StandardUsage,
};
use crate::error::{LlmError, Result};
use crate::provider::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderCapabilities, Usage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Default chat model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// `OpenAI` API provider.
///
/// Talks to the chat completions API. Requests flagged with
/// [`CompletionRequest::json_output`] are sent in JSON mode.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a new `OpenAI` provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_model(api_key, DEFAULT_OPENAI_MODEL)
    }

    /// Create a new `OpenAI` provider with a specific model.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            client: build_http_client(Some(60))?,
            base_url: "https://api.openai.com/v1".to_string(),
        })
    }

    /// Replace the HTTP client timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Result<Self> {
        self.client = build_http_client(Some(timeout_secs))?;
        Ok(self)
    }

    /// Point the provider at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert internal request to `OpenAI` API format.
    fn to_api_request(&self, request: &CompletionRequest) -> OpenAiRequest {
        let mut messages: Vec<StandardMessage> = Vec::new();

        if let Some(system) = &request.system_prompt {
            messages.push(StandardMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        for message in &request.messages {
            messages.push(StandardMessage {
                role: convert_role_standard(message.role),
                content: message.content.clone(),
            });
        }

        OpenAiRequest {
            model: self.model.clone(),
            messages,
            response_format: request.json_output.then(|| ResponseFormat {
                kind: "json_object".to_string(),
            }),
        }
    }

    /// Convert `OpenAI` API response to internal format.
    fn convert_api_response(response: OpenAiResponse) -> Result<CompletionResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidProviderResponse {
                provider: "openai".to_string(),
                message: "no choices in response".to_string(),
            })?;

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            model: response.model,
            stop_reason: choice.finish_reason,
            usage: response.usage.map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_request = self.to_api_request(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await?;
        let response = check_status("openai", response).await?;

        let api_response: OpenAiResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidProviderResponse {
                    provider: "openai".to_string(),
                    message: format!("Failed to parse response: {e}"),
                })?;

        Self::convert_api_response(api_response)
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            max_context_tokens: 16_385,
            supports_structured_output: true,
            model_name: self.model.clone(),
        }
    }

    fn provider_id(&self) -> &'static str {
        "openai"
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<StandardMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<StandardUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}
