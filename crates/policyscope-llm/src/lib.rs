//! PolicyScope LLM - hosted text-generation back-ends and privacy analysis.
//!
//! This crate wraps two hosted providers behind the [`LlmProvider`] trait and
//! turns extracted page signals into a structured [`AnalysisResult`] with
//! [`PrivacyAnalyzer`].
//!
//! # Example
//!
//! ```rust,no_run
//! use policyscope_core::{AnalysisConfig, AppConfig, ExtractedSignals, ProviderKind};
//! use policyscope_llm::PrivacyAnalyzer;
//!
//! # async fn example() {
//! let analyzer = PrivacyAnalyzer::from_config(&AppConfig::default());
//! let signals = ExtractedSignals::new("https://example.com");
//!
//! // Never fails: problems come back as an ERROR sentinel result.
//! let result = analyzer
//!     .analyze(&signals, &AnalysisConfig::new(ProviderKind::OpenAi))
//!     .await;
//! println!("score {} ({})", result.score, result.risk_level);
//! # }
//! ```
//!
//! [`AnalysisResult`]: policyscope_core::AnalysisResult

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod analysis;
pub mod error;
pub mod factory;
pub mod provider;
pub mod providers;

// Re-export commonly used types
pub use analysis::{build_prompt, parse_analysis, strip_code_fences, PrivacyAnalyzer};
pub use error::{LlmError, Result};
pub use factory::{HostedProviderFactory, ProviderFactory};
pub use provider::{
    CompletionRequest, CompletionResponse, LlmProvider, Message, ProviderCapabilities, Role,
    Usage,
};
pub use providers::{GeminiProvider, OpenAiProvider};
