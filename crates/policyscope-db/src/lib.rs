//! PolicyScope Database Layer
//!
//! Persists scan lifecycle records in `SQLite` using `SQLx` with embedded
//! migrations.
//!
//! # Example
//!
//! ```ignore
//! use policyscope_db::Database;
//!
//! let db = Database::new("policyscope.db").await?;
//! db.run_migrations().await?;
//! let stats = db.stats().await?;
//! ```
//!
//! # Lifecycle
//!
//! - A record is inserted PENDING before any extraction work starts
//! - It is updated exactly once more, to COMPLETED or FAILED
//! - Terminal rows are never rewritten; a second commit is rejected

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod migrations;
pub mod scans;

// Re-export commonly used types
pub use error::{DatabaseError, Result};
pub use scans::TerminalOutcome;

use policyscope_core::{ProviderKind, ScanId, ScanRecord, ScanStats};
use std::path::Path;

/// High-level database handle.
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: sqlx::SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `path`.
    ///
    /// `:memory:` opens a private in-memory database.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::open_pool(path).await?;
        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::new(":memory:").await
    }

    /// Run all pending database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    /// Insert a PENDING scan record.
    pub async fn create_pending(&self, url: &str, provider: ProviderKind) -> Result<ScanRecord> {
        scans::create_pending(&self.pool, url, provider).await
    }

    /// Move a PENDING scan to COMPLETED or FAILED.
    pub async fn commit_terminal(
        &self,
        id: &ScanId,
        outcome: &TerminalOutcome,
    ) -> Result<ScanRecord> {
        scans::commit_terminal(&self.pool, id, outcome).await
    }

    /// Fetch one scan record.
    pub async fn get_scan(&self, id: &ScanId) -> Result<Option<ScanRecord>> {
        scans::get_scan(&self.pool, id).await
    }

    /// Most recent scans, newest first.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<ScanRecord>> {
        scans::list_recent(&self.pool, limit).await
    }

    /// Aggregate scan statistics.
    pub async fn stats(&self) -> Result<ScanStats> {
        scans::stats(&self.pool).await
    }
}
