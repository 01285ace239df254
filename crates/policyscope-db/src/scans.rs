//! Scan record persistence.
//!
//! A scan row is written twice at most: once when it is created PENDING and
//! once when it reaches a terminal status. The terminal write is guarded in
//! SQL so a finished scan can never be rewritten.

use chrono::{DateTime, Utc};
use policyscope_core::{ProviderKind, RiskLevel, ScanId, ScanRecord, ScanStats, ScanStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::{DatabaseError, Result};

/// Final state written by [`commit_terminal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOutcome {
    /// Analysis finished, possibly with an `ERROR` risk level.
    Completed {
        /// Privacy score
        score: u8,
        /// Overall risk level
        risk_level: RiskLevel,
        /// Serialized analysis payload
        report: String,
    },
    /// The scan aborted.
    Failed {
        /// Failure message stored as the report
        reason: String,
    },
}

impl TerminalOutcome {
    /// Status the record ends up in.
    #[must_use]
    pub fn status(&self) -> ScanStatus {
        match self {
            Self::Completed { .. } => ScanStatus::Completed,
            Self::Failed { .. } => ScanStatus::Failed,
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, url, status, ai_provider, score, risk_level, report, created_at, completed_at FROM scans";

/// Insert a new PENDING scan.
pub async fn create_pending(
    pool: &SqlitePool,
    url: &str,
    provider: ProviderKind,
) -> Result<ScanRecord> {
    let record = ScanRecord {
        id: ScanId::generate(),
        url: url.to_string(),
        status: ScanStatus::Pending,
        ai_provider: provider,
        score: None,
        risk_level: None,
        report: None,
        created_at: Utc::now(),
        completed_at: None,
    };

    sqlx::query(
        "INSERT INTO scans (id, url, status, ai_provider, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(record.id.as_str())
    .bind(&record.url)
    .bind(record.status.as_str())
    .bind(provider.as_str())
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    tracing::debug!("Created pending scan {} for {}", record.id, record.url);
    Ok(record)
}

/// Move a PENDING scan to its terminal status.
///
/// Fails with [`DatabaseError::AlreadyTerminal`] if the scan already left
/// PENDING, and [`DatabaseError::NotFound`] if it does not exist.
pub async fn commit_terminal(
    pool: &SqlitePool,
    id: &ScanId,
    outcome: &TerminalOutcome,
) -> Result<ScanRecord> {
    let completed_at = Utc::now();
    let (score, risk_level, report) = match outcome {
        TerminalOutcome::Completed {
            score,
            risk_level,
            report,
        } => (Some(i64::from(*score)), Some(risk_level.as_str()), report.as_str()),
        TerminalOutcome::Failed { reason } => (None, None, reason.as_str()),
    };

    let result = sqlx::query(
        "UPDATE scans
         SET status = ?, score = ?, risk_level = ?, report = ?, completed_at = ?
         WHERE id = ? AND status = 'PENDING'",
    )
    .bind(outcome.status().as_str())
    .bind(score)
    .bind(risk_level)
    .bind(report)
    .bind(completed_at.to_rfc3339())
    .bind(id.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match get_scan(pool, id).await? {
            Some(_) => Err(DatabaseError::AlreadyTerminal(id.to_string())),
            None => Err(DatabaseError::NotFound(id.to_string())),
        };
    }

    tracing::debug!("Scan {} committed as {}", id, outcome.status());

    get_scan(pool, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(id.to_string()))
}

/// Fetch a single scan.
pub async fn get_scan(pool: &SqlitePool, id: &ScanId) -> Result<Option<ScanRecord>> {
    let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(id.as_str())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Most recent scans, newest first.
pub async fn list_recent(pool: &SqlitePool, limit: u32) -> Result<Vec<ScanRecord>> {
    let rows = sqlx::query(&format!(
        "{SELECT_COLUMNS} ORDER BY created_at DESC, rowid DESC LIMIT ?"
    ))
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

/// Aggregate counters over every persisted scan.
pub async fn stats(pool: &SqlitePool) -> Result<ScanStats> {
    let (total, high_risk, unique_urls): (i64, i64, i64) = sqlx::query_as(
        "SELECT
             COUNT(*),
             COALESCE(SUM(CASE WHEN risk_level IN ('HIGH', 'CRITICAL') THEN 1 ELSE 0 END), 0),
             COUNT(DISTINCT url)
         FROM scans",
    )
    .fetch_one(pool)
    .await?;

    Ok(ScanStats {
        total_scans: to_count(total)?,
        high_risk_scans: to_count(high_risk)?,
        unique_url_count: to_count(unique_urls)?,
    })
}

fn to_count(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| DatabaseError::Decode(format!("negative count {value}")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("invalid timestamp '{value}': {e}")))
}

fn record_from_row(row: &SqliteRow) -> Result<ScanRecord> {
    let decode = |e: policyscope_core::PolicyScopeError| DatabaseError::Decode(e.to_string());

    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let provider: String = row.try_get("ai_provider")?;
    let score: Option<i64> = row.try_get("score")?;
    let risk_level: Option<String> = row.try_get("risk_level")?;
    let created_at: String = row.try_get("created_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;

    let score = score
        .map(|s| {
            u8::try_from(s).map_err(|_| DatabaseError::Decode(format!("score {s} out of range")))
        })
        .transpose()?;

    Ok(ScanRecord {
        id: ScanId::parse(id).map_err(decode)?,
        url: row.try_get("url")?,
        status: status.parse().map_err(decode)?,
        ai_provider: provider.parse().map_err(decode)?,
        score,
        risk_level: risk_level
            .map(|r| r.parse::<RiskLevel>())
            .transpose()
            .map_err(decode)?,
        report: row.try_get("report")?,
        created_at: parse_timestamp(&created_at)?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
    })
}
