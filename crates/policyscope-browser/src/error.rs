use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser unavailable: {0}")]
    Unavailable(String),

    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("navigation to {url} timed out after {seconds}s")]
    NavigationTimeout { url: String, seconds: u64 },

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("chromium error: {0}")]
    ChromiumError(String),
}

impl BrowserError {
    /// Whether the error means no browser process can serve the request.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
