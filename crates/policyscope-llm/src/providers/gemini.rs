//! Google Gemini API provider implementation.

use super::common::{build_http_client, check_status, convert_role_gemini};
use crate::error::{LlmError, Result};
use crate::provider::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderCapabilities, Usage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Default generation model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Google Gemini API provider.
///
/// Calls the `generateContent` endpoint with the key as a query parameter.
/// Gemini uses "user"/"model" roles instead of "user"/"assistant", and JSON
/// output is obtained through the prompt alone.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_model(api_key, DEFAULT_GEMINI_MODEL)
    }

    /// Create a new Gemini provider with a specific model.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            client: build_http_client(Some(60))?,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
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

    /// Convert internal request to Gemini API format.
    #[allow(clippy::unused_self)]
    fn to_api_request(&self, request: &CompletionRequest) -> GeminiRequest {
        let system_instruction = request.system_prompt.as_ref().map(|prompt| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: prompt.clone(),
            }],
        });

        let contents = request
            .messages
            .iter()
            .map(|message| GeminiContent {
                role: Some(convert_role_gemini(message.role)),
                parts: vec![GeminiPart {
                    text: message.content.clone(),
                }],
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction,
        }
    }

    /// Convert Gemini API response to internal format.
    fn convert_api_response(&self, response: GeminiResponse) -> Result<CompletionResponse> {
        let candidate =
            response
                .candidates
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::InvalidProviderResponse {
                    provider: "gemini".to_string(),
                    message: "no candidates in response".to_string(),
                })?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: text,
            model: response
                .model_version
                .unwrap_or_else(|| self.model.clone()),
            stop_reason: candidate.finish_reason,
            usage: response.usage_metadata.map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            }),
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_request = self.to_api_request(&request);

        // The key travels in the query string; keep it out of error messages.
        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&api_request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let response = check_status("gemini", response).await?;

        let api_response: GeminiResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidProviderResponse {
                    provider: "gemini".to_string(),
                    message: format!("Failed to parse response: {}", e.without_url()),
                })?;

        self.convert_api_response(api_response)
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            max_context_tokens: 1_048_576,
            supports_structured_output: false,
            model_name: self.model.clone(),
        }
    }

    fn provider_id(&self) -> &'static str {
        "gemini"
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    model_version: Option<String>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}
