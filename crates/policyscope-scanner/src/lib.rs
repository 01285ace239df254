//! PolicyScope Scanner - privacy scan lifecycle.
//!
//! This crate ties the pieces of a scan together: the robots.txt
//! [`ComplianceGate`], the [`PageExtractor`] driving a shared headless
//! browser, the analysis provider and the [`ScanRecorder`] that persists
//! each scan's lifecycle.
//!
//! # Example
//!
//! ```rust,ignore
//! use policyscope_core::{AnalysisConfig, AppConfig, ProviderKind};
//! use policyscope_db::Database;
//! use policyscope_scanner::ScanEngine;
//! use std::sync::Arc;
//!
//! let config = AppConfig::load()?;
//! let db = Database::new(config.database_path()?).await?;
//! db.run_migrations().await?;
//!
//! let engine = ScanEngine::from_config(&config, Arc::new(db))?;
//! engine.start().await;
//!
//! let outcome = engine
//!     .scan("https://example.com", AnalysisConfig::new(ProviderKind::Gemini))
//!     .await?;
//! println!("{}", outcome.record().status);
//!
//! engine.shutdown().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod recorder;
pub mod robots;

// Re-export commonly used types
pub use error::{Result, ScanError};
pub use extractor::{body_text, parse_page, resolve_policy_url, PageExtractor, ParsedPage};
pub use orchestrator::{validate_url, CompletedScan, FailedScan, ScanEngine, ScanOutcome};
pub use recorder::ScanRecorder;
pub use robots::{ComplianceGate, GateDecision};
