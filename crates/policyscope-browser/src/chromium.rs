//! chromiumoxide-backed implementation of the automation traits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Cookie, SetUserAgentOverrideParams};
use chromiumoxide::cdp::browser_protocol::page::{EventLifecycleEvent, NavigateParams};
use chromiumoxide::cdp::browser_protocol::storage::GetCookiesParams;
use chromiumoxide::Page;
use futures::StreamExt;
use policyscope_core::CookieRecord;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::actions::{PageHandle, WaitUntil};
use crate::error::{BrowserError, Result};
use crate::process::{BrowserLauncher, BrowserProcess, LaunchOptions};

fn cdp_error(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::ChromiumError(e.to_string())
}

/// Launches a local Chrome/Chromium through chromiumoxide.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumLauncher;

#[async_trait::async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserProcess>> {
        let mut builder = BrowserConfig::builder().request_timeout(options.request_timeout);
        if !options.headless {
            builder = builder.with_head();
        }
        for arg in &options.args {
            builder = builder.arg(arg.as_str());
        }
        let config = builder.build().map_err(BrowserError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let alive = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&alive);
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler error: {}", e);
                }
            }
            flag.store(false, Ordering::SeqCst);
            tracing::warn!("browser connection closed");
        });

        tracing::info!(headless = options.headless, "browser launched");

        Ok(Arc::new(ChromiumProcess {
            browser: RwLock::new(browser),
            alive,
            handler_task,
        }))
    }
}

struct ChromiumProcess {
    // `Browser::close` needs `&mut self`
    browser: RwLock<Browser>,
    alive: Arc<AtomicBool>,
    handler_task: JoinHandle<()>,
}

#[async_trait::async_trait]
impl BrowserProcess for ChromiumProcess {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>> {
        if !self.is_alive() {
            return Err(BrowserError::Unavailable(
                "browser process has exited".to_string(),
            ));
        }

        let browser = self.browser.read().await;
        let page = browser.new_page("about:blank").await.map_err(cdp_error)?;
        Ok(Box::new(ChromiumPage { page }))
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.handler_task.is_finished()
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.write().await;
        let closed = browser.close().await.map(|_| ()).map_err(cdp_error);
        if let Err(e) = browser.wait().await {
            tracing::debug!("waiting for browser exit failed: {}", e);
        }
        self.handler_task.abort();
        self.alive.store(false, Ordering::SeqCst);
        closed
    }
}

struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    async fn navigate_inner(&self, url: &str, wait: WaitUntil) -> Result<()> {
        // Subscribe before navigating so the milestone cannot be missed.
        let mut events = self
            .page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(cdp_error)?;

        let response = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
        let result = response.result;
        if let Some(error_text) = result.error_text {
            return Err(BrowserError::NavigationError(format!("{url}: {error_text}")));
        }

        let target = wait.lifecycle_event();
        while let Some(event) = events.next().await {
            if event.frame_id != result.frame_id || event.name != target {
                continue;
            }
            if let Some(loader_id) = &result.loader_id {
                if &event.loader_id != loader_id {
                    continue;
                }
            }
            return Ok(());
        }

        Err(BrowserError::NavigationError(format!(
            "{url}: page closed before {target}"
        )))
    }
}

#[async_trait::async_trait]
impl PageHandle for ChromiumPage {
    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.page
            .set_user_agent(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map(|_| ())
            .map_err(cdp_error)
    }

    async fn navigate(&self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.navigate_inner(url, wait))
            .await
            .map_err(|_| BrowserError::NavigationTimeout {
                url: url.to_string(),
                seconds: timeout.as_secs(),
            })?
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::Extraction(e.to_string()))
    }

    /// Every cookie in the browser context, third-party ones included.
    async fn cookies(&self) -> Result<Vec<CookieRecord>> {
        let response = self
            .page
            .execute(GetCookiesParams::default())
            .await
            .map_err(cdp_error)?;
        response
            .result
            .cookies
            .into_iter()
            .map(cookie_record)
            .collect()
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await.map_err(cdp_error)
    }
}

/// Pass a CDP cookie through, keeping every attribute it reports.
fn cookie_record(cookie: Cookie) -> Result<CookieRecord> {
    serde_json::to_value(cookie)
        .and_then(serde_json::from_value::<CookieRecord>)
        .map_err(|e| BrowserError::Extraction(format!("malformed cookie: {e}")))
}
