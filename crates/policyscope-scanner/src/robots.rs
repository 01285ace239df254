//! robots.txt compliance gate.
//!
//! The gate performs a single bounded fetch of `/robots.txt` for the target
//! origin and evaluates it for the scanner's user-agent token. When the file
//! cannot be obtained as text the gate fails open: the scan is allowed, a
//! warning is logged and [`ComplianceGate::fail_open_count`] is incremented.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use policyscope_core::ScanningConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use url::Url;

use crate::error::{Result, ScanError};

/// Outcome of a robots.txt check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// robots.txt permits the URL.
    Allowed,
    /// robots.txt forbids the URL.
    Disallowed,
    /// robots.txt could not be evaluated; the URL is allowed anyway.
    FailedOpen {
        /// Why evaluation was impossible
        reason: String,
    },
}

impl GateDecision {
    /// Whether the scan may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Disallowed)
    }
}

/// Decides whether a target may be scanned according to its robots.txt.
#[derive(Debug)]
pub struct ComplianceGate {
    client: Client,
    token: String,
    fail_open: AtomicU64,
}

impl ComplianceGate {
    /// Create a gate.
    ///
    /// `user_agent` is sent with the robots.txt request; `token` is the
    /// product token matched against `User-agent:` groups.
    pub fn new(user_agent: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::Setup(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.into(),
            fail_open: AtomicU64::new(0),
        })
    }

    /// Create a gate from the `[scanning]` config section.
    pub fn from_config(config: &ScanningConfig) -> Result<Self> {
        Self::new(
            &config.user_agent,
            config.robots_token.clone(),
            config.robots_timeout(),
        )
    }

    /// `scheme://host[:port]/robots.txt` for a target.
    #[must_use]
    pub fn robots_url(target: &Url) -> Option<Url> {
        target.join("/robots.txt").ok()
    }

    /// Number of checks that failed open since the gate was created.
    #[must_use]
    pub fn fail_open_count(&self) -> u64 {
        self.fail_open.load(Ordering::Relaxed)
    }

    /// Shorthand for `self.check(target).await.is_allowed()`.
    pub async fn is_allowed(&self, target: &Url) -> bool {
        self.check(target).await.is_allowed()
    }

    /// Evaluate robots.txt for `target`.
    pub async fn check(&self, target: &Url) -> GateDecision {
        let Some(robots_url) = Self::robots_url(target) else {
            return self.failed_open(target, "cannot derive robots.txt location".to_string());
        };

        tracing::info!("Checking robots.txt at {}", robots_url);

        let body = match self.fetch(&robots_url).await {
            Ok(body) => body,
            Err(reason) => return self.failed_open(target, reason),
        };

        let mut matcher = DefaultMatcher::default();
        if matcher.one_agent_allowed_by_robots(&body, &self.token, target.as_str()) {
            GateDecision::Allowed
        } else {
            tracing::info!("robots.txt disallows {} for {}", target, self.token);
            GateDecision::Disallowed
        }
    }

    /// Fetch the robots body as text. Any status code is accepted.
    ///
    /// JSON bodies and bodies that are not UTF-8 cannot be evaluated. A
    /// leading byte-order mark is dropped.
    async fn fetch(&self, robots_url: &Url) -> std::result::Result<String, String> {
        let response = self
            .client
            .get(robots_url.clone())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);
        if let Some(content_type) = content_type.filter(|ct| ct.contains("json")) {
            return Err(format!("JSON robots.txt body ({content_type})"));
        }

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        decode_body(&bytes)
    }

    fn failed_open(&self, target: &Url, reason: String) -> GateDecision {
        self.fail_open.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            "Could not check robots.txt for {}: {}. Proceeding with caution.",
            target,
            reason
        );
        GateDecision::FailedOpen { reason }
    }
}

fn decode_body(bytes: &[u8]) -> std::result::Result<String, String> {
    let text = std::str::from_utf8(bytes).map_err(|_| "robots.txt body is not UTF-8".to_string())?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}
