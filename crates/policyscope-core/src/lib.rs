//! PolicyScope Core - Foundation crate for the policyscope compliance scanner.
//!
//! This crate provides the shared data model, error handling and configuration
//! management that the browser, analysis, storage and scanner crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Scan records, signal bundles, analysis results and provider tags
//!
//! # Example
//!
//! ```rust
//! use policyscope_core::{AnalysisConfig, AppConfig, ProviderKind};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.browser.navigation_timeout_secs, 45);
//!
//! let provider: ProviderKind = "openai".parse()?;
//! let analysis = AnalysisConfig::new(provider);
//! assert!(analysis.api_key.is_none());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, BrowserConfig, DatabaseConfig, LlmConfig, ScanningConfig};
pub use error::{ConfigError, ConfigResult, PolicyScopeError, Result};
pub use types::{
    AnalysisConfig, AnalysisResult, CookieRecord, ExtractedSignals, PageMetadata, ProviderKind,
    RiskFinding, RiskLevel, ScanId, ScanRecord, ScanStats, ScanStatus,
};
