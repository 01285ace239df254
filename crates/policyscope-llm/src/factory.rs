//! Construction of provider clients for a `(provider, key)` pair.

use std::sync::Arc;

use policyscope_core::{LlmConfig, ProviderKind};

use crate::error::Result;
use crate::provider::LlmProvider;
use crate::providers::{GeminiProvider, OpenAiProvider};

/// Builds provider clients bound to a credential.
pub trait ProviderFactory: Send + Sync {
    /// Create a client for `kind` authenticated with `api_key`.
    fn create(&self, kind: ProviderKind, api_key: &str) -> Result<Arc<dyn LlmProvider>>;
}

/// Factory for the real hosted APIs.
#[derive(Debug, Clone, Default)]
pub struct HostedProviderFactory {
    config: LlmConfig,
}

impl HostedProviderFactory {
    /// Create a factory using models and timeouts from `config`.
    #[must_use]
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }
}

impl ProviderFactory for HostedProviderFactory {
    fn create(&self, kind: ProviderKind, api_key: &str) -> Result<Arc<dyn LlmProvider>> {
        let timeout = self.config.request_timeout_secs;
        Ok(match kind {
            ProviderKind::Gemini => Arc::new(
                GeminiProvider::with_model(api_key, &self.config.gemini_model)?
                    .with_timeout(timeout)?,
            ),
            ProviderKind::OpenAi => Arc::new(
                OpenAiProvider::with_model(api_key, &self.config.openai_model)?
                    .with_timeout(timeout)?,
            ),
        })
    }
}
