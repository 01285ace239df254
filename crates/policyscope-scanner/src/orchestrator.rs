//! Scan engine coordinating one scan end to end.
//!
//! Stages run strictly in order for a single scan: URL validation, the
//! robots.txt gate, the PENDING record, extraction, analysis and the terminal
//! commit. Separate scans share nothing but the browser process and run
//! concurrently.

use std::sync::Arc;

use policyscope_browser::{BrowserEngine, BrowserError, LaunchOptions};
use policyscope_core::{
    AnalysisConfig, AnalysisResult, AppConfig, ExtractedSignals, ProviderKind, ScanId,
    ScanRecord, ScanStats,
};
use policyscope_db::TerminalOutcome;
use policyscope_llm::PrivacyAnalyzer;
use serde::Serialize;
use url::Url;

use crate::error::{Result, ScanError};
use crate::extractor::PageExtractor;
use crate::recorder::ScanRecorder;
use crate::robots::{ComplianceGate, GateDecision};

/// A scan that reached COMPLETED.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedScan {
    /// Committed record
    pub record: ScanRecord,
    /// Extracted page signals
    pub signals: ExtractedSignals,
    /// Analysis verdict, possibly an `ERROR` sentinel
    pub analysis: AnalysisResult,
    /// Provider that was asked
    pub provider: ProviderKind,
}

/// A scan that reached FAILED.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedScan {
    /// Committed record
    pub record: ScanRecord,
    /// Why the scan aborted
    pub reason: String,
}

/// Terminal result of [`ScanEngine::scan`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "UPPERCASE")]
pub enum ScanOutcome {
    /// Analysis ran (it may still have degraded to a sentinel).
    Completed(CompletedScan),
    /// Extraction failed.
    Failed(FailedScan),
}

impl ScanOutcome {
    /// The committed record.
    #[must_use]
    pub fn record(&self) -> &ScanRecord {
        match self {
            Self::Completed(scan) => &scan.record,
            Self::Failed(scan) => &scan.record,
        }
    }
}

/// Validate that `url` is an absolute http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<Url> {
    let invalid = |reason: &str| ScanError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(url.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("only http and https URLs can be scanned"));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid("URL has no host"));
    }
    Ok(parsed)
}

/// Privacy scan engine.
pub struct ScanEngine {
    browser: Arc<BrowserEngine>,
    gate: ComplianceGate,
    extractor: PageExtractor,
    analyzer: Arc<PrivacyAnalyzer>,
    recorder: Arc<dyn ScanRecorder>,
}

impl ScanEngine {
    /// Assemble an engine from its parts.
    #[must_use]
    pub fn new(
        browser: Arc<BrowserEngine>,
        gate: ComplianceGate,
        extractor: PageExtractor,
        analyzer: Arc<PrivacyAnalyzer>,
        recorder: Arc<dyn ScanRecorder>,
    ) -> Self {
        Self {
            browser,
            gate,
            extractor,
            analyzer,
            recorder,
        }
    }

    /// Build an engine backed by a local Chromium and the hosted providers.
    pub fn from_config(config: &AppConfig, recorder: Arc<dyn ScanRecorder>) -> Result<Self> {
        Ok(Self::new(
            Arc::new(BrowserEngine::new(LaunchOptions::from_config(&config.browser))),
            ComplianceGate::from_config(&config.scanning)?,
            PageExtractor::from_config(config),
            Arc::new(PrivacyAnalyzer::from_config(config)),
            recorder,
        ))
    }

    /// Launch the shared browser.
    ///
    /// A launch failure is logged and left for the next scan to retry.
    pub async fn start(&self) {
        if let Err(e) = self.browser.start().await {
            tracing::error!("Failed to launch browser instance: {}", e);
        }
    }

    /// Close the shared browser.
    pub async fn shutdown(&self) {
        if let Err(e) = self.browser.stop().await {
            tracing::warn!("Browser shutdown failed: {}", e);
        }
    }

    /// Shared browser handle.
    #[must_use]
    pub fn browser(&self) -> &BrowserEngine {
        &self.browser
    }

    /// robots.txt gate.
    #[must_use]
    pub fn gate(&self) -> &ComplianceGate {
        &self.gate
    }

    /// Scan `url` and analyze it with `config`.
    ///
    /// Malformed URLs and robots.txt denials are rejected before any record
    /// exists. Otherwise a PENDING record is created and committed exactly
    /// once, as COMPLETED or FAILED, and the outcome is returned.
    pub async fn scan(&self, url: &str, config: AnalysisConfig) -> Result<ScanOutcome> {
        let url = url.trim();
        let target = validate_url(url)?;

        tracing::info!("Starting scan for: {}", url);

        match self.gate.check(&target).await {
            GateDecision::Disallowed => {
                return Err(ScanError::RobotsDisallowed {
                    url: url.to_string(),
                })
            }
            GateDecision::Allowed | GateDecision::FailedOpen { .. } => {}
        }

        let pending = self.recorder.create_pending(url, config.provider).await?;

        let (outcome, result) = match self.run(url, &config).await {
            Ok((signals, analysis)) => {
                let report = serde_json::to_string(&analysis).unwrap_or_else(|e| {
                    tracing::warn!("Failed to serialize analysis: {}", e);
                    String::new()
                });
                (
                    TerminalOutcome::Completed {
                        score: analysis.score,
                        risk_level: analysis.risk_level,
                        report,
                    },
                    Ok((signals, analysis)),
                )
            }
            Err(e) => {
                tracing::error!("Scan failed: {}", e);
                let reason = e.to_string();
                (
                    TerminalOutcome::Failed {
                        reason: reason.clone(),
                    },
                    Err(reason),
                )
            }
        };

        let record = self.recorder.commit_terminal(&pending.id, &outcome).await?;
        tracing::info!("Scan {} finished as {}", record.id, record.status);

        Ok(match result {
            Ok((signals, analysis)) => ScanOutcome::Completed(CompletedScan {
                record,
                signals,
                analysis,
                provider: config.provider,
            }),
            Err(reason) => ScanOutcome::Failed(FailedScan { record, reason }),
        })
    }

    async fn run(
        &self,
        url: &str,
        config: &AnalysisConfig,
    ) -> std::result::Result<(ExtractedSignals, AnalysisResult), BrowserError> {
        let page = self.browser.acquire_page().await?;
        let signals = self.extractor.extract(&self.browser, page, url).await?;
        let analysis = self.analyzer.analyze(&signals, config).await;
        Ok((signals, analysis))
    }

    /// Aggregate statistics over all persisted scans.
    pub async fn get_stats(&self) -> Result<ScanStats> {
        Ok(self.recorder.stats().await?)
    }

    /// Most recent scans, newest first.
    pub async fn history(&self, limit: u32) -> Result<Vec<ScanRecord>> {
        Ok(self.recorder.history(limit).await?)
    }

    /// One scan by id.
    pub async fn get_scan(&self, id: &ScanId) -> Result<Option<ScanRecord>> {
        Ok(self.recorder.get_scan(id).await?)
    }
}
