use policyscope_db::DatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("scanning {url} is forbidden by robots.txt")]
    RobotsDisallowed { url: String },

    #[error("persistence error: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("scanner setup failed: {0}")]
    Setup(String),
}

impl ScanError {
    /// Whether the request was turned away before any record was written.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::InvalidUrl { .. } | Self::RobotsDisallowed { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
