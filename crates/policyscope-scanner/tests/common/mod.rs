//! Scripted browser and provider doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use policyscope_browser::{
    BrowserEngine, BrowserError, BrowserLauncher, BrowserProcess, LaunchOptions, PageHandle,
    WaitUntil,
};
use policyscope_core::{CookieRecord, ProviderKind, ScanId, ScanRecord, ScanStats};
use policyscope_db::{Database, TerminalOutcome};
use policyscope_llm::{
    CompletionRequest, CompletionResponse, HostedProviderFactory, LlmProvider, PrivacyAnalyzer,
    ProviderCapabilities,
};
use policyscope_scanner::{ComplianceGate, PageExtractor, ScanEngine, ScanRecorder};

pub const USER_AGENT: &str =
    "PolicyScopeBot/1.0 (+http://localhost:5173/bot-info) Mozilla/5.0 Compatible";

pub const VERDICT: &str =
    r#"{"score":70,"riskLevel":"MEDIUM","analysis":"ok","risks":[],"recommendations":[]}"#;

/// What the fake browser serves.
#[derive(Debug, Default, Clone)]
pub struct FakeSite {
    pub pages: HashMap<String, String>,
    pub failing: HashSet<String>,
    pub cookies: Vec<CookieRecord>,
    pub cookies_fail: bool,
}

impl FakeSite {
    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    pub fn cookie(mut self, name: &str, domain: &str) -> Self {
        self.cookies.push(CookieRecord {
            name: name.to_string(),
            domain: domain.to_string(),
            ..CookieRecord::default()
        });
        self
    }

    pub fn cookies_fail(mut self) -> Self {
        self.cookies_fail = true;
        self
    }
}

/// Counters observed across every page the fake browser opened.
#[derive(Debug, Default)]
pub struct BrowserLog {
    pub launches: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub user_agents: Mutex<Vec<String>>,
    pub navigations: Mutex<Vec<(String, WaitUntil, Duration)>>,
}

impl BrowserLog {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<(String, WaitUntil, Duration)> {
        self.navigations.lock().expect("lock").clone()
    }
}

pub struct FakeLauncher {
    site: Arc<FakeSite>,
    log: Arc<BrowserLog>,
    fail_launch: bool,
}

impl FakeLauncher {
    pub fn new(site: FakeSite, log: Arc<BrowserLog>) -> Self {
        Self {
            site: Arc::new(site),
            log,
            fail_launch: false,
        }
    }

    pub fn broken(log: Arc<BrowserLog>) -> Self {
        Self {
            site: Arc::new(FakeSite::default()),
            log,
            fail_launch: true,
        }
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(
        &self,
        _options: &LaunchOptions,
    ) -> policyscope_browser::Result<Arc<dyn BrowserProcess>> {
        self.log.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(BrowserError::LaunchFailed(
                "chrome binary not found".to_string(),
            ));
        }
        Ok(Arc::new(FakeProcess {
            site: Arc::clone(&self.site),
            log: Arc::clone(&self.log),
            alive: AtomicBool::new(true),
        }))
    }
}

struct FakeProcess {
    site: Arc<FakeSite>,
    log: Arc<BrowserLog>,
    alive: AtomicBool,
}

#[async_trait::async_trait]
impl BrowserProcess for FakeProcess {
    async fn new_page(&self) -> policyscope_browser::Result<Box<dyn PageHandle>> {
        self.log.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            site: Arc::clone(&self.site),
            log: Arc::clone(&self.log),
            current: Mutex::new(None),
        }))
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn close(&self) -> policyscope_browser::Result<()> {
        self.alive.store(false, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    site: Arc<FakeSite>,
    log: Arc<BrowserLog>,
    current: Mutex<Option<String>>,
}

#[async_trait::async_trait]
impl PageHandle for FakePage {
    async fn set_user_agent(&self, user_agent: &str) -> policyscope_browser::Result<()> {
        self.log
            .user_agents
            .lock()
            .expect("lock")
            .push(user_agent.to_string());
        Ok(())
    }

    async fn navigate(
        &self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> policyscope_browser::Result<()> {
        self.log
            .navigations
            .lock()
            .expect("lock")
            .push((url.to_string(), wait, timeout));

        if self.site.failing.contains(url) {
            return Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        match self.site.pages.get(url) {
            Some(html) => {
                *self.current.lock().expect("lock") = Some(html.clone());
                Ok(())
            }
            None => Err(BrowserError::NavigationError(format!(
                "{url}: net::ERR_NAME_NOT_RESOLVED"
            ))),
        }
    }

    async fn content(&self) -> policyscope_browser::Result<String> {
        Ok(self.current.lock().expect("lock").clone().unwrap_or_default())
    }

    async fn cookies(&self) -> policyscope_browser::Result<Vec<CookieRecord>> {
        if self.site.cookies_fail {
            return Err(BrowserError::ChromiumError(
                "Network.getAllCookies failed".to_string(),
            ));
        }
        Ok(self.site.cookies.clone())
    }

    async fn close(self: Box<Self>) -> policyscope_browser::Result<()> {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn browser(launcher: FakeLauncher) -> Arc<BrowserEngine> {
    Arc::new(BrowserEngine::with_launcher(
        Arc::new(launcher),
        LaunchOptions::default(),
    ))
}

pub fn extractor() -> PageExtractor {
    PageExtractor::new(
        USER_AGENT,
        Duration::from_secs(45),
        Duration::from_secs(15),
        15_000,
    )
}

pub fn gate() -> ComplianceGate {
    ComplianceGate::new(USER_AGENT, "PolicyScopeBot", Duration::from_secs(5)).expect("create gate")
}

/// Provider answering every prompt with the same text.
pub struct StubProvider {
    reply: String,
    pub calls: AtomicUsize,
}

impl StubProvider {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for StubProvider {
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> policyscope_llm::Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CompletionResponse {
            content: self.reply.clone(),
            model: "stub".to_string(),
            stop_reason: None,
            usage: None,
        })
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            max_context_tokens: 8192,
            supports_structured_output: false,
            model_name: "stub".to_string(),
        }
    }

    fn provider_id(&self) -> &str {
        "stub"
    }
}

/// Analyzer whose only default client is `provider` for Gemini.
pub fn analyzer_with(provider: Arc<StubProvider>) -> Arc<PrivacyAnalyzer> {
    Arc::new(
        PrivacyAnalyzer::new(Arc::new(HostedProviderFactory::default()))
            .with_default_provider(ProviderKind::Gemini, provider),
    )
}

/// Analyzer with no credentials at all.
pub fn analyzer_without_keys() -> Arc<PrivacyAnalyzer> {
    Arc::new(PrivacyAnalyzer::new(Arc::new(
        HostedProviderFactory::default(),
    )))
}

/// Database wrapper counting lifecycle writes.
pub struct CountingRecorder {
    pub db: Database,
    pub created: AtomicUsize,
    pub commits: AtomicUsize,
}

impl CountingRecorder {
    pub async fn new() -> Arc<Self> {
        let db = Database::in_memory().await.expect("create database");
        db.run_migrations().await.expect("run migrations");
        Arc::new(Self {
            db,
            created: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ScanRecorder for CountingRecorder {
    async fn create_pending(
        &self,
        url: &str,
        provider: ProviderKind,
    ) -> policyscope_db::Result<ScanRecord> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.db.create_pending(url, provider).await
    }

    async fn commit_terminal(
        &self,
        id: &ScanId,
        outcome: &TerminalOutcome,
    ) -> policyscope_db::Result<ScanRecord> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.db.commit_terminal(id, outcome).await
    }

    async fn stats(&self) -> policyscope_db::Result<ScanStats> {
        self.db.stats().await
    }

    async fn get_scan(&self, id: &ScanId) -> policyscope_db::Result<Option<ScanRecord>> {
        self.db.get_scan(id).await
    }

    async fn history(&self, limit: u32) -> policyscope_db::Result<Vec<ScanRecord>> {
        self.db.list_recent(limit).await
    }
}

pub fn engine(
    browser: Arc<BrowserEngine>,
    analyzer: Arc<PrivacyAnalyzer>,
    recorder: Arc<CountingRecorder>,
) -> ScanEngine {
    ScanEngine::new(browser, gate(), extractor(), analyzer, recorder)
}
