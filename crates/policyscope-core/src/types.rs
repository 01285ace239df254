//! Shared types used across policyscope.
//!
//! This module defines the scan record and its lifecycle enums, the transient
//! signal bundle produced by page extraction, and the structured verdict
//! returned by an analysis provider.

use crate::error::PolicyScopeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Newtype for scan identifiers.
///
/// Scan IDs are UUID v4 strings assigned when the pending record is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(String);

impl ScanId {
    /// Create a new random `ScanId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Parse a `ScanId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID is not a valid UUID.
    pub fn parse(id: impl Into<String>) -> Result<Self, PolicyScopeError> {
        let id = id.into();
        uuid::Uuid::parse_str(&id).map_err(|e| {
            PolicyScopeError::Validation(format!("invalid scan ID '{id}': {e}"))
        })?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a scan record.
///
/// A record starts `Pending` and moves exactly once to `Completed` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanStatus {
    /// Scan accepted, pipeline still running
    Pending,
    /// Pipeline finished and an analysis was recorded
    Completed,
    /// Pipeline aborted with a reason
    Failed,
}

impl ScanStatus {
    /// Storage representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether the status admits no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = PolicyScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(PolicyScopeError::Validation(format!(
                "unknown scan status '{other}'"
            ))),
        }
    }
}

/// Risk level assigned by an analysis.
///
/// `Error` is reserved for the sentinel result produced when analysis could
/// not be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Low risk
    Low,
    /// Medium risk
    Medium,
    /// High risk
    High,
    /// Critical risk
    Critical,
    /// Analysis failed
    Error,
}

impl RiskLevel {
    /// Storage representation of the risk level.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
            Self::Error => "ERROR",
        }
    }

    /// Whether this level counts towards the high-risk statistic.
    #[must_use]
    pub fn is_high_risk(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = PolicyScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            "ERROR" => Ok(Self::Error),
            other => Err(PolicyScopeError::Validation(format!(
                "unknown risk level '{other}'"
            ))),
        }
    }
}

/// Hosted text-generation back-ends that can interpret a signal bundle.
///
/// This is a closed set: unknown tags are rejected when parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini
    #[default]
    Gemini,
    /// `OpenAI` chat completions
    OpenAi,
}

impl ProviderKind {
    /// All known providers.
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Gemini, ProviderKind::OpenAi];

    /// Tag used in configuration, storage and request headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = PolicyScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(PolicyScopeError::Validation(format!(
                "unknown analysis provider '{other}' (expected 'gemini' or 'openai')"
            ))),
        }
    }
}

/// Per-request analysis settings.
///
/// A present `api_key` overrides the engine-wide credential for the selected
/// provider. When neither is available the analysis degrades to an error
/// sentinel instead of failing the scan.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Provider that will interpret the signal bundle
    pub provider: ProviderKind,
    /// Optional per-request credential
    pub api_key: Option<String>,
}

impl AnalysisConfig {
    /// Create a config for a provider using the engine-wide credential.
    #[must_use]
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            api_key: None,
        }
    }

    /// Attach a per-request credential. Blank keys are treated as absent.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = if api_key.trim().is_empty() {
            None
        } else {
            Some(api_key)
        };
        self
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A cookie as reported by the browser-automation layer.
///
/// Only the fields the engine reads are typed; every other attribute is kept
/// verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    /// Cookie name
    pub name: String,
    /// Owning domain
    #[serde(default)]
    pub domain: String,
    /// Secure flag
    #[serde(default)]
    pub secure: bool,
    /// Remaining attributes (value, path, expires, httpOnly, sameSite, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Page metadata pulled from the rendered document head.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Contents of `<title>`
    pub title: String,
    /// `<meta name="description">` content
    pub description: Option<String>,
    /// `<meta name="generator">` content
    pub generator: Option<String>,
}

/// Structured signals extracted from a target page.
///
/// Transient: handed to analysis and returned to the caller, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedSignals {
    /// Target URL
    pub url: String,
    /// Cookies present after the page settled
    pub cookies: Vec<CookieRecord>,
    /// External script sources, in document order
    pub scripts: Vec<String>,
    /// Collapsed, truncated body text of the linked privacy policy
    pub privacy_policy_text: String,
    /// Page metadata
    pub metadata: PageMetadata,
}

impl ExtractedSignals {
    /// Empty bundle for a URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// One risk identified by the analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFinding {
    /// Risk category (e.g. GDPR, CCPA, tracking)
    #[serde(default)]
    pub category: String,
    /// What was found
    #[serde(default)]
    pub description: String,
    /// Severity as reported by the provider
    #[serde(default)]
    pub severity: String,
}

/// Structured verdict produced by an analysis provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Privacy score, 0-100 where 100 is safest
    pub score: u8,
    /// Overall risk level
    pub risk_level: RiskLevel,
    /// Free-text summary
    #[serde(default)]
    pub analysis: String,
    /// Identified risks
    #[serde(default)]
    pub risks: Vec<RiskFinding>,
    /// Recommended improvements
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Failure reason, only set on sentinel results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Build the sentinel returned when analysis could not be performed.
    #[must_use]
    pub fn sentinel(provider: ProviderKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            score: 0,
            risk_level: RiskLevel::Error,
            analysis: format!("Failed to analyze data with {provider}. Error: {reason}"),
            risks: Vec::new(),
            recommendations: Vec::new(),
            error: Some(reason),
        }
    }

    /// Whether this result is an error sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.risk_level == RiskLevel::Error
    }
}

/// Persisted record of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    /// Unique identifier
    pub id: ScanId,
    /// Target URL
    pub url: String,
    /// Lifecycle status
    pub status: ScanStatus,
    /// Provider selected at creation
    pub ai_provider: ProviderKind,
    /// Score, only on completed scans
    pub score: Option<u8>,
    /// Risk level, set at the terminal transition
    pub risk_level: Option<RiskLevel>,
    /// Serialized analysis (completed) or failure message (failed)
    pub report: Option<String>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScanRecord {
    /// Whether the record has reached a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Aggregate statistics over persisted scan records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    /// Number of scan records
    pub total_scans: u64,
    /// Records whose risk level is HIGH or CRITICAL
    pub high_risk_scans: u64,
    /// Number of distinct scanned URLs
    pub unique_url_count: u64,
}
