//! Page signal extraction.
//!
//! Navigation of the primary page is a hard requirement; cookies and the
//! linked privacy policy are best effort and degrade to empty values.

use std::time::Duration;

use policyscope_browser::{BrowserEngine, BrowserError, PageHandle, WaitUntil};
use policyscope_core::{AppConfig, ExtractedSignals, PageMetadata};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Markup-derived parts of the signal bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// `src` of every script element that has one, in document order
    pub scripts: Vec<String>,
    /// Title, description and generator
    pub metadata: PageMetadata,
    /// `href` of the first anchor mentioning "privacy", unresolved
    pub policy_href: Option<String>,
}

static SCRIPT_SRC: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script[src]").expect("valid selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).expect("valid selector"));
static META_GENERATOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="generator"]"#).expect("valid selector"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));

/// Parse a rendered document into scripts, metadata and the policy link.
#[must_use]
pub fn parse_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    let scripts = document
        .select(&SCRIPT_SRC)
        .filter_map(|el| el.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(str::to_string)
        .collect();

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();
    let meta = |selector: &Selector| {
        document
            .select(selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(str::to_string)
    };

    ParsedPage {
        scripts,
        metadata: PageMetadata {
            title,
            description: meta(&*META_DESCRIPTION),
            generator: meta(&*META_GENERATOR),
        },
        policy_href: find_policy_href(&document),
    }
}

/// First anchor whose text or href mentions "privacy", case-insensitively.
///
/// A matching anchor without an `href` ends the search with no link.
fn find_policy_href(document: &Html) -> Option<String> {
    document
        .select(&ANCHOR)
        .find(|anchor| {
            let text = anchor.text().collect::<String>().to_lowercase();
            let href = anchor.value().attr("href").unwrap_or_default().to_lowercase();
            text.contains("privacy") || href.contains("privacy")
        })
        .and_then(|anchor| anchor.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
        .map(str::to_string)
}

/// Visible body text with whitespace collapsed, cut to `limit` characters.
#[must_use]
pub fn body_text(html: &str, limit: usize) -> String {
    let document = Html::parse_document(html);
    let Some(body) = document.select(&BODY).next() else {
        return String::new();
    };

    let mut raw = String::new();
    collect_text(body, &mut raw);

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(limit).collect()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) if matches!(el.name(), "script" | "style" | "noscript") => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
}

/// Resolve a policy `href` against the page URL; only http(s) targets count.
#[must_use]
pub fn resolve_policy_url(page_url: &str, href: &str) -> Option<Url> {
    let resolved = Url::parse(page_url).ok()?.join(href.trim()).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Drives a page through the extraction steps.
#[derive(Debug, Clone)]
pub struct PageExtractor {
    user_agent: String,
    navigation_timeout: Duration,
    policy_timeout: Duration,
    policy_text_limit: usize,
}

impl PageExtractor {
    /// Create an extractor.
    #[must_use]
    pub fn new(
        user_agent: impl Into<String>,
        navigation_timeout: Duration,
        policy_timeout: Duration,
        policy_text_limit: usize,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            navigation_timeout,
            policy_timeout,
            policy_text_limit,
        }
    }

    /// Create an extractor from application config.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.scanning.user_agent.clone(),
            config.browser.navigation_timeout(),
            config.browser.policy_timeout(),
            config.scanning.policy_text_limit,
        )
    }

    /// Extract signals from `url` using `page`, which is always closed
    /// before this returns.
    ///
    /// A secondary page for the privacy policy is opened from `browser`.
    pub async fn extract(
        &self,
        browser: &BrowserEngine,
        page: Box<dyn PageHandle>,
        url: &str,
    ) -> Result<ExtractedSignals, BrowserError> {
        let result = self.extract_from(browser, page.as_ref(), url).await;
        if let Err(e) = page.close().await {
            tracing::warn!("Failed to close page for {}: {}", url, e);
        }
        result
    }

    async fn extract_from(
        &self,
        browser: &BrowserEngine,
        page: &dyn PageHandle,
        url: &str,
    ) -> Result<ExtractedSignals, BrowserError> {
        page.set_user_agent(&self.user_agent).await?;
        page.navigate(url, WaitUntil::NetworkIdle, self.navigation_timeout)
            .await?;
        let html = page.content().await?;

        let cookies = match page.cookies().await {
            Ok(cookies) => cookies,
            Err(e) => {
                tracing::warn!("Failed to extract cookies: {}", e);
                Vec::new()
            }
        };

        let parsed = parse_page(&html);

        let privacy_policy_text = match parsed
            .policy_href
            .as_deref()
            .and_then(|href| resolve_policy_url(url, href))
        {
            Some(policy_url) => self
                .fetch_policy_text(browser, &policy_url)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Failed to fetch privacy policy: {}", e);
                    String::new()
                }),
            None => String::new(),
        };

        Ok(ExtractedSignals {
            url: url.to_string(),
            cookies,
            scripts: parsed.scripts,
            privacy_policy_text,
            metadata: parsed.metadata,
        })
    }

    async fn fetch_policy_text(
        &self,
        browser: &BrowserEngine,
        policy_url: &Url,
    ) -> Result<String, BrowserError> {
        tracing::debug!("Fetching privacy policy from {}", policy_url);

        let page = browser.new_page().await?;
        let result: Result<String, BrowserError> = async {
            page.set_user_agent(&self.user_agent).await?;
            page.navigate(
                policy_url.as_str(),
                WaitUntil::DomContentLoaded,
                self.policy_timeout,
            )
            .await?;
            page.content().await
        }
        .await;

        if let Err(e) = page.close().await {
            tracing::warn!("Failed to close policy page {}: {}", policy_url, e);
        }

        Ok(body_text(&result?, self.policy_text_limit))
    }
}
