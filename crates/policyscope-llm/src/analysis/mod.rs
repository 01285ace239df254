//! Privacy analysis of extracted page signals.

mod parse;
mod prompt;

pub use parse::{parse_analysis, strip_code_fences};
pub use prompt::{build_prompt, NO_POLICY_TEXT};

use std::collections::HashMap;
use std::sync::Arc;

use policyscope_core::{AnalysisConfig, AnalysisResult, AppConfig, ExtractedSignals, ProviderKind};

use crate::error::{LlmError, Result};
use crate::factory::{HostedProviderFactory, ProviderFactory};
use crate::provider::{CompletionRequest, LlmProvider};

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Default number of policy characters embedded in the prompt.
pub const DEFAULT_POLICY_PROMPT_CHARS: usize = 2000;

/// Turns a signal bundle into a structured privacy verdict.
///
/// Default clients are built once from the engine-wide credentials; a
/// per-request key always gets its own one-off client.
pub struct PrivacyAnalyzer {
    factory: Arc<dyn ProviderFactory>,
    defaults: HashMap<ProviderKind, Arc<dyn LlmProvider>>,
    policy_prompt_chars: usize,
}

impl PrivacyAnalyzer {
    /// Create an analyzer with no default clients.
    #[must_use]
    pub fn new(factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            factory,
            defaults: HashMap::new(),
            policy_prompt_chars: DEFAULT_POLICY_PROMPT_CHARS,
        }
    }

    /// Create an analyzer for the hosted APIs, with default clients for
    /// every provider whose engine-wide key is configured.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let factory: Arc<dyn ProviderFactory> =
            Arc::new(HostedProviderFactory::new(config.llm.clone()));
        let mut analyzer = Self::new(factory)
            .with_policy_prompt_chars(config.scanning.policy_prompt_chars);

        for kind in ProviderKind::ALL {
            let Some(key) = config.llm.api_key_for(kind) else {
                tracing::info!("No default {} key configured", kind);
                continue;
            };
            match analyzer.factory.create(kind, key) {
                Ok(provider) => {
                    analyzer.defaults.insert(kind, provider);
                }
                Err(e) => tracing::warn!("Failed to build default {} client: {}", kind, e),
            }
        }

        analyzer
    }

    /// Install a default client for a provider.
    #[must_use]
    pub fn with_default_provider(
        mut self,
        kind: ProviderKind,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        self.defaults.insert(kind, provider);
        self
    }

    /// Set how much policy text is embedded in the prompt.
    #[must_use]
    pub fn with_policy_prompt_chars(mut self, chars: usize) -> Self {
        self.policy_prompt_chars = chars;
        self
    }

    /// Whether an engine-wide client exists for `kind`.
    #[must_use]
    pub fn has_default(&self, kind: ProviderKind) -> bool {
        self.defaults.contains_key(&kind)
    }

    fn resolve(&self, config: &AnalysisConfig) -> Result<Arc<dyn LlmProvider>> {
        if let Some(key) = config.api_key.as_deref() {
            return self.factory.create(config.provider, key);
        }
        self.defaults
            .get(&config.provider)
            .cloned()
            .ok_or_else(|| LlmError::CredentialMissing {
                provider: config.provider.to_string(),
            })
    }

    /// Run the analysis, surfacing every failure.
    pub async fn try_analyze(
        &self,
        signals: &ExtractedSignals,
        config: &AnalysisConfig,
    ) -> Result<AnalysisResult> {
        let provider = self.resolve(config)?;

        let mut request = CompletionRequest::new(build_prompt(signals, self.policy_prompt_chars));
        // Gemini gets the prompt alone.
        if config.provider == ProviderKind::OpenAi {
            request = request.with_system_prompt(SYSTEM_PROMPT);
        }
        if provider.capabilities().supports_structured_output {
            request = request.with_json_output();
        }

        let response = provider.complete(request).await?;
        parse_analysis(config.provider.as_str(), &response.content)
    }

    /// Run the analysis. Never fails: any credential, transport or parse
    /// problem yields an `ERROR` sentinel result with score 0.
    pub async fn analyze(
        &self,
        signals: &ExtractedSignals,
        config: &AnalysisConfig,
    ) -> AnalysisResult {
        tracing::info!(
            "Analyzing {} with provider: {} ({})",
            signals.url,
            config.provider,
            if config.api_key.is_some() {
                "using custom key"
            } else {
                "using default key"
            }
        );

        match self.try_analyze(signals, config).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Analysis failed: {}", e);
                AnalysisResult::sentinel(config.provider, e.to_string())
            }
        }
    }
}
