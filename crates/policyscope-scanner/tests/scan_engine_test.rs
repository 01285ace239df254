//! End-to-end scan lifecycle tests against a scripted browser.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{
    analyzer_with, analyzer_without_keys, browser, engine, BrowserLog, CountingRecorder,
    FakeLauncher, FakeSite, StubProvider, USER_AGENT, VERDICT,
};
use policyscope_browser::WaitUntil;
use policyscope_core::{AnalysisConfig, ProviderKind, RiskLevel, ScanStatus};
use policyscope_scanner::{ScanError, ScanOutcome};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PLAIN_PAGE: &str = r#"<html><head><title>Shop</title>
<script src="https://cdn.example/a.js"></script></head>
<body><a href="/terms">Terms</a></body></html>"#;

const PAGE_WITH_POLICY: &str = r#"<html><head><title>Shop</title></head>
<body><a href="/privacy">Privacy Policy</a></body></html>"#;

const POLICY_PAGE: &str = r"<html><body>
<h1>Privacy   Policy</h1>
<p>We share data with partners.</p>
<script>track();</script>
</body></html>";

async fn robots_server(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn gemini() -> AnalysisConfig {
    AnalysisConfig::new(ProviderKind::Gemini)
}

fn completed(outcome: ScanOutcome) -> policyscope_scanner::CompletedScan {
    match outcome {
        ScanOutcome::Completed(scan) => scan,
        ScanOutcome::Failed(scan) => panic!("scan failed: {}", scan.reason),
    }
}

#[tokio::test]
async fn test_scan_completes_end_to_end() {
    let server = robots_server("User-agent: *\nAllow: /\n").await;
    let url = format!("{}/", server.uri());

    let log = Arc::new(BrowserLog::default());
    let site = FakeSite::default()
        .page(url.clone(), PLAIN_PAGE)
        .cookie("_ga", "shop.example");
    let provider = StubProvider::new(VERDICT);
    let recorder = CountingRecorder::new().await;
    let engine = engine(
        browser(FakeLauncher::new(site, Arc::clone(&log))),
        analyzer_with(Arc::clone(&provider)),
        Arc::clone(&recorder),
    );
    engine.start().await;

    let scan = completed(engine.scan(&url, gemini()).await.expect("scan"));

    assert_eq!(scan.record.status, ScanStatus::Completed);
    assert_eq!(scan.record.score, Some(70));
    assert_eq!(scan.record.risk_level, Some(RiskLevel::Medium));
    assert_eq!(scan.record.url, url);
    assert!(scan.record.completed_at.is_some());
    assert_eq!(scan.analysis.score, 70);
    assert_eq!(scan.signals.scripts, vec!["https://cdn.example/a.js"]);
    assert_eq!(scan.signals.privacy_policy_text, "");
    assert_eq!(scan.signals.metadata.title, "Shop");
    assert_eq!(scan.signals.cookies.len(), 1);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    let navigations = log.navigations();
    assert_eq!(navigations.len(), 1);
    assert_eq!(navigations[0].1, WaitUntil::NetworkIdle);
    assert_eq!(log.user_agents.lock().expect("lock")[0], USER_AGENT);
    assert_eq!(log.opened(), log.closed());

    let stored = engine
        .get_scan(&scan.record.id)
        .await
        .expect("get")
        .expect("record exists");
    assert_eq!(stored, scan.record);
    let report: serde_json::Value =
        serde_json::from_str(stored.report.as_deref().expect("report")).expect("report json");
    assert_eq!(report["riskLevel"], "MEDIUM");
}

#[tokio::test]
async fn test_robots_disallow_creates_no_record() {
    let server = robots_server("User-agent: *\nDisallow: /\n").await;
    let url = format!("{}/", server.uri());

    let log = Arc::new(BrowserLog::default());
    let recorder = CountingRecorder::new().await;
    let engine = engine(
        browser(FakeLauncher::new(
            FakeSite::default().page(url.clone(), PLAIN_PAGE),
            Arc::clone(&log),
        )),
        analyzer_with(StubProvider::new(VERDICT)),
        Arc::clone(&recorder),
    );
    engine.start().await;

    let err = engine.scan(&url, gemini()).await.expect_err("disallowed");

    assert!(matches!(err, ScanError::RobotsDisallowed { .. }));
    assert!(err.is_rejection());
    assert_eq!(recorder.created(), 0);
    assert_eq!(engine.get_stats().await.expect("stats").total_scans, 0);
    assert_eq!(log.opened(), 0);
}

#[tokio::test]
async fn test_invalid_url_creates_no_record() {
    let recorder = CountingRecorder::new().await;
    let engine = engine(
        browser(FakeLauncher::new(
            FakeSite::default(),
            Arc::new(BrowserLog::default()),
        )),
        analyzer_with(StubProvider::new(VERDICT)),
        Arc::clone(&recorder),
    );

    for url in ["not a url", "ftp://example.com/", ""] {
        let err = engine.scan(url, gemini()).await.expect_err(url);
        assert!(matches!(err, ScanError::InvalidUrl { .. }), "{url}");
    }
    assert_eq!(recorder.created(), 0);
}

#[tokio::test]
async fn test_navigation_failure_commits_failed() {
    let server = robots_server("User-agent: *\nAllow: /\n").await;
    let url = format!("{}/slow", server.uri());

    let log = Arc::new(BrowserLog::default());
    let provider = StubProvider::new(VERDICT);
    let recorder = CountingRecorder::new().await;
    let engine = engine(
        browser(FakeLauncher::new(
            FakeSite::default().failing(url.clone()),
            Arc::clone(&log),
        )),
        analyzer_with(Arc::clone(&provider)),
        Arc::clone(&recorder),
    );
    engine.start().await;

    let outcome = engine.scan(&url, gemini()).await.expect("scan");
    let ScanOutcome::Failed(failed) = outcome else {
        panic!("expected FAILED outcome");
    };

    assert_eq!(failed.record.status, ScanStatus::Failed);
    assert!(failed.record.score.is_none());
    assert!(failed.record.risk_level.is_none());
    assert!(failed.reason.contains("timed out") || failed.reason.contains("slow"));
    assert_eq!(failed.record.report.as_deref(), Some(failed.reason.as_str()));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.commits(), 1);
    assert_eq!(log.opened(), 1);
    assert_eq!(log.closed(), 1);
}

#[tokio::test]
async fn test_cookie_failure_yields_empty_cookies() {
    let server = robots_server("User-agent: *\nAllow: /\n").await;
    let url = format!("{}/", server.uri());

    let recorder = CountingRecorder::new().await;
    let engine = engine(
        browser(FakeLauncher::new(
            FakeSite::default()
                .page(url.clone(), PLAIN_PAGE)
                .cookie("session", "shop.example")
                .cookies_fail(),
            Arc::new(BrowserLog::default()),
        )),
        analyzer_with(StubProvider::new(VERDICT)),
        recorder,
    );
    engine.start().await;

    let scan = completed(engine.scan(&url, gemini()).await.expect("scan"));
    assert!(scan.signals.cookies.is_empty());
    assert_eq!(scan.record.status, ScanStatus::Completed);
}

#[tokio::test]
async fn test_policy_text_is_fetched_from_linked_page() {
    let server = robots_server("User-agent: *\nAllow: /\n").await;
    let url = format!("{}/", server.uri());
    let policy_url = format!("{}/privacy", server.uri());

    let log = Arc::new(BrowserLog::default());
    let recorder = CountingRecorder::new().await;
    let engine = engine(
        browser(FakeLauncher::new(
            FakeSite::default()
                .page(url.clone(), PAGE_WITH_POLICY)
                .page(policy_url.clone(), POLICY_PAGE),
            Arc::clone(&log),
        )),
        analyzer_with(StubProvider::new(VERDICT)),
        recorder,
    );
    engine.start().await;

    let scan = completed(engine.scan(&url, gemini()).await.expect("scan"));

    assert_eq!(
        scan.signals.privacy_policy_text,
        "Privacy Policy We share data with partners."
    );
    let navigations = log.navigations();
    assert_eq!(navigations.len(), 2);
    assert_eq!(navigations[1].0, policy_url);
    assert_eq!(navigations[1].1, WaitUntil::DomContentLoaded);
    assert_eq!(log.opened(), 2);
    assert_eq!(log.closed(), 2);
}

#[tokio::test]
async fn test_unreachable_policy_page_is_ignored() {
    let server = robots_server("User-agent: *\nAllow: /\n").await;
    let url = format!("{}/", server.uri());

    let log = Arc::new(BrowserLog::default());
    let recorder = CountingRecorder::new().await;
    let engine = engine(
        browser(FakeLauncher::new(
            FakeSite::default().page(url.clone(), PAGE_WITH_POLICY),
            Arc::clone(&log),
        )),
        analyzer_with(StubProvider::new(VERDICT)),
        recorder,
    );
    engine.start().await;

    let scan = completed(engine.scan(&url, gemini()).await.expect("scan"));

    assert_eq!(scan.signals.privacy_policy_text, "");
    assert_eq!(scan.record.status, ScanStatus::Completed);
    assert_eq!(log.opened(), log.closed());
}

#[tokio::test]
async fn test_missing_credential_completes_with_error_sentinel() {
    let server = robots_server("User-agent: *\nAllow: /\n").await;
    let url = format!("{}/", server.uri());

    let recorder = CountingRecorder::new().await;
    let engine = engine(
        browser(FakeLauncher::new(
            FakeSite::default().page(url.clone(), PLAIN_PAGE),
            Arc::new(BrowserLog::default()),
        )),
        analyzer_without_keys(),
        Arc::clone(&recorder),
    );
    engine.start().await;

    let scan = completed(
        engine
            .scan(&url, AnalysisConfig::new(ProviderKind::OpenAi))
            .await
            .expect("scan"),
    );

    assert_eq!(scan.record.status, ScanStatus::Completed);
    assert_eq!(scan.record.score, Some(0));
    assert_eq!(scan.record.risk_level, Some(RiskLevel::Error));
    assert_eq!(scan.record.ai_provider, ProviderKind::OpenAi);
    assert!(scan.analysis.is_sentinel());
    assert!(scan
        .analysis
        .error
        .as_deref()
        .is_some_and(|e| e.contains("API key not configured")));
    assert_eq!(recorder.commits(), 1);
}

#[tokio::test]
async fn test_browser_launch_failure_commits_failed() {
    let server = robots_server("User-agent: *\nAllow: /\n").await;
    let url = format!("{}/", server.uri());

    let log = Arc::new(BrowserLog::default());
    let recorder = CountingRecorder::new().await;
    let engine = engine(
        browser(FakeLauncher::broken(Arc::clone(&log))),
        analyzer_with(StubProvider::new(VERDICT)),
        Arc::clone(&recorder),
    );
    engine.start().await;

    let outcome = engine.scan(&url, gemini()).await.expect("scan");

    assert_eq!(outcome.record().status, ScanStatus::Failed);
    assert_eq!(recorder.created(), 1);
    assert_eq!(recorder.commits(), 1);
    // Startup attempt plus one restart attempt during the scan.
    assert_eq!(log.launches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_scans_each_commit_once() {
    let server = robots_server("User-agent: *\nAllow: /\n").await;
    let urls: Vec<String> = (0..6).map(|i| format!("{}/p{i}", server.uri())).collect();

    let mut site = FakeSite::default();
    for url in &urls {
        site = site.page(url.clone(), PLAIN_PAGE);
    }
    let log = Arc::new(BrowserLog::default());
    let recorder = CountingRecorder::new().await;
    let engine = Arc::new(engine(
        browser(FakeLauncher::new(site, Arc::clone(&log))),
        analyzer_with(StubProvider::new(VERDICT)),
        Arc::clone(&recorder),
    ));
    engine.start().await;

    let handles: Vec<_> = urls
        .iter()
        .cloned()
        .map(|url| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.scan(&url, gemini()).await })
        })
        .collect();

    for handle in handles {
        let outcome = handle.await.expect("join").expect("scan");
        assert_eq!(outcome.record().status, ScanStatus::Completed);
    }

    assert_eq!(recorder.created(), urls.len());
    assert_eq!(recorder.commits(), urls.len());
    assert_eq!(log.launches.load(Ordering::SeqCst), 1);
    assert_eq!(log.opened(), log.closed());

    let stats = engine.get_stats().await.expect("stats");
    assert_eq!(stats.total_scans, 6);
    assert_eq!(stats.unique_url_count, 6);

    let history = engine.history(3).await.expect("history");
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn test_outcome_serializes_with_status_tag() {
    let server = robots_server("").await;
    let url = format!("{}/", server.uri());

    let engine = engine(
        browser(FakeLauncher::new(
            FakeSite::default().page(url.clone(), PLAIN_PAGE),
            Arc::new(BrowserLog::default()),
        )),
        analyzer_with(StubProvider::new(VERDICT)),
        CountingRecorder::new().await,
    );
    engine.start().await;

    let outcome = engine.scan(&url, gemini()).await.expect("scan");
    let json = serde_json::to_value(&outcome).expect("serialize");

    assert_eq!(json["status"], "COMPLETED");
    assert_eq!(json["analysis"]["riskLevel"], "MEDIUM");
    assert_eq!(json["signals"]["scripts"][0], "https://cdn.example/a.js");
}
