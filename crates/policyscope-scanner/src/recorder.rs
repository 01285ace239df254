//! Storage seam for the scan lifecycle.

use async_trait::async_trait;
use policyscope_core::{ProviderKind, ScanId, ScanRecord, ScanStats};
use policyscope_db::{Database, Result, TerminalOutcome};

/// The two lifecycle writes plus the reads the engine exposes.
///
/// Every scan that passes the compliance gate calls `create_pending` once
/// and `commit_terminal` exactly once.
#[async_trait]
pub trait ScanRecorder: Send + Sync {
    /// Record a new PENDING scan.
    async fn create_pending(&self, url: &str, provider: ProviderKind) -> Result<ScanRecord>;

    /// Move a PENDING scan to its terminal status.
    async fn commit_terminal(&self, id: &ScanId, outcome: &TerminalOutcome)
        -> Result<ScanRecord>;

    /// Aggregate counters.
    async fn stats(&self) -> Result<ScanStats>;

    /// One record by id.
    async fn get_scan(&self, id: &ScanId) -> Result<Option<ScanRecord>>;

    /// Most recent records, newest first.
    async fn history(&self, limit: u32) -> Result<Vec<ScanRecord>>;
}

#[async_trait]
impl ScanRecorder for Database {
    async fn create_pending(&self, url: &str, provider: ProviderKind) -> Result<ScanRecord> {
        Database::create_pending(self, url, provider).await
    }

    async fn commit_terminal(
        &self,
        id: &ScanId,
        outcome: &TerminalOutcome,
    ) -> Result<ScanRecord> {
        Database::commit_terminal(self, id, outcome).await
    }

    async fn stats(&self) -> Result<ScanStats> {
        Database::stats(self).await
    }

    async fn get_scan(&self, id: &ScanId) -> Result<Option<ScanRecord>> {
        Database::get_scan(self, id).await
    }

    async fn history(&self, limit: u32) -> Result<Vec<ScanRecord>> {
        self.list_recent(limit).await
    }
}
