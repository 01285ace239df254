use std::time::Duration;

use policyscope_core::CookieRecord;

use crate::error::Result;

/// Load milestone a navigation waits for before it is considered done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Network has (almost) gone quiet: at most two in-flight connections.
    NetworkIdle,
    /// The DOM has been parsed; subresources may still be loading.
    DomContentLoaded,
}

impl WaitUntil {
    /// CDP lifecycle event name that signals this milestone.
    #[must_use]
    pub fn lifecycle_event(self) -> &'static str {
        match self {
            Self::NetworkIdle => "networkAlmostIdle",
            Self::DomContentLoaded => "DOMContentLoaded",
        }
    }
}

/// One isolated page context inside the shared browser process.
///
/// Every handle must be closed by its owner once it is done, on success and
/// on failure alike.
#[async_trait::async_trait]
pub trait PageHandle: Send + Sync {
    /// Override the user agent sent by this page.
    async fn set_user_agent(&self, user_agent: &str) -> Result<()>;

    /// Navigate and wait for `wait`, failing after `timeout`.
    async fn navigate(&self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<()>;

    /// Serialized HTML of the current document.
    async fn content(&self) -> Result<String>;

    /// Every cookie visible to the browser context.
    async fn cookies(&self) -> Result<Vec<CookieRecord>>;

    /// Close the page and release its resources.
    async fn close(self: Box<Self>) -> Result<()>;
}
