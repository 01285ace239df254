use std::sync::Arc;
use std::time::Duration;

use policyscope_core::BrowserConfig;

use crate::actions::PageHandle;
use crate::error::Result;

/// Settings handed to a [`BrowserLauncher`].
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a visible window.
    pub headless: bool,
    /// Extra command line flags for the browser binary.
    pub args: Vec<String>,
    /// Timeout for individual protocol requests.
    pub request_timeout: Duration,
}

impl LaunchOptions {
    /// Build launch options from the `[browser]` config section.
    #[must_use]
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            args: config.launch_args.clone(),
            request_timeout: config.navigation_timeout(),
        }
    }
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default())
    }
}

/// Starts browser processes.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a new process.
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserProcess>>;
}

/// A running browser process.
#[async_trait::async_trait]
pub trait BrowserProcess: Send + Sync {
    /// Open a fresh page context.
    async fn new_page(&self) -> Result<Box<dyn PageHandle>>;

    /// Whether the process is still connected.
    fn is_alive(&self) -> bool;

    /// Shut the process down.
    async fn close(&self) -> Result<()>;
}
