//! Core LLM provider trait and request/response types.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for hosted text-generation back-ends.
///
/// Provider implementations must be thread-safe (Send + Sync) so a single
/// default client can serve concurrent scans.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt with a single response.
    ///
    /// # Errors
    /// Returns error if the provider fails, network issues occur, or response parsing fails.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the capabilities of this provider.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Get the unique identifier for this provider.
    fn provider_id(&self) -> &str;
}

/// Capabilities of an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Maximum context window size in tokens
    pub max_context_tokens: usize,

    /// Supports constraining output to JSON at the transport level
    pub supports_structured_output: bool,

    /// Model name or identifier
    pub model_name: String,
}

/// Request for LLM completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The prompt or conversation messages
    pub messages: Vec<Message>,

    /// System prompt (optional)
    pub system_prompt: Option<String>,

    /// Ask the provider to emit a JSON object, where supported
    #[serde(default)]
    pub json_output: bool,
}

impl CompletionRequest {
    /// Create a new completion request with a simple user message.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(content)],
            system_prompt: None,
            json_output: false,
        }
    }

    /// Set the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Request JSON output.
    #[must_use]
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message (instructions, context)
    System,
    /// User message (prompt, question)
    User,
    /// Assistant message (response)
    Assistant,
}

/// Response from LLM completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Stop reason (e.g., "stop", "`STOP`")
    pub stop_reason: Option<String>,

    /// Usage statistics
    pub usage: Option<Usage>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens consumed
    pub input_tokens: u32,

    /// Output tokens generated
    pub output_tokens: u32,
}

impl Usage {
    /// Get total tokens used.
    #[must_use]
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_builder() {
        let req = CompletionRequest::new("Hello")
            .with_system_prompt("You are a helpful assistant.")
            .with_json_output();

        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].content, "Hello");
        assert_eq!(req.messages[0].role, Role::User);
        assert_eq!(
            req.system_prompt.as_deref(),
            Some("You are a helpful assistant.")
        );
        assert!(req.json_output);
    }

    #[test]
    fn test_json_output_defaults_off() {
        assert!(!CompletionRequest::new("Hello").json_output);
    }

    #[test]
    fn test_usage_total_tokens() {
        let usage = Usage {
            input_tokens: 10,
            output_tokens: 20,
        };
        assert_eq!(usage.total_tokens(), 30);
    }
}
