//! # Stage Ledger Storage
//!
//! Rows of `stage_entries`, shared by applications and complaints.
//!
//! ## Append With Optimistic Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  read record + version + history      (outside any transaction)        │
//! │  Ledger::append(...)                  (pure, portal-core)              │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    UPDATE <table> SET status, version = version + 1                     │
//! │     WHERE reference_number = ? AND version = ?                          │
//! │          └── 0 rows → ConcurrentModification, rollback                  │
//! │    INSERT INTO stage_entries (reference_number, seq, ...)               │
//! │          └── UNIQUE (reference_number, seq) → ConcurrentModification    │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use portal_core::{StageEntry, ValidationError};
use sqlx::{SqliteConnection, SqlitePool};
use std::fmt::Display;
use std::str::FromStr;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// The table whose row carries the status and version of a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LedgerOwner {
    Application,
    Complaint,
}

impl LedgerOwner {
    fn table(&self) -> &'static str {
        match self {
            LedgerOwner::Application => "applications",
            LedgerOwner::Complaint => "complaints",
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StageRecord {
    stage_name: String,
    status: String,
    remarks: Option<String>,
    recorded_at: DateTime<Utc>,
}

/// Inserts one ledger row. `seq` is the 1-based position of the entry.
pub(crate) async fn insert_stage<S: Display>(
    conn: &mut SqliteConnection,
    reference_number: &str,
    seq: i64,
    entry: &StageEntry<S>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stage_entries (
            id, reference_number, seq, stage_name, status, remarks, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(reference_number)
    .bind(seq)
    .bind(&entry.stage_name)
    .bind(entry.status.to_string())
    .bind(&entry.remarks)
    .bind(entry.timestamp)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Loads the full history of a record, oldest first.
pub(crate) async fn load_stages<S>(
    pool: &SqlitePool,
    reference_number: &str,
) -> DbResult<Vec<StageEntry<S>>>
where
    S: FromStr<Err = ValidationError>,
{
    let records = sqlx::query_as::<_, StageRecord>(
        r#"
        SELECT stage_name, status, remarks, recorded_at
        FROM stage_entries
        WHERE reference_number = ?1
        ORDER BY seq
        "#,
    )
    .bind(reference_number)
    .fetch_all(pool)
    .await?;

    records
        .into_iter()
        .map(|record| {
            let status = record
                .status
                .parse::<S>()
                .map_err(|e| DbError::corrupt("stage status", e))?;
            Ok(StageEntry {
                stage_name: record.stage_name,
                status,
                timestamp: record.recorded_at,
                remarks: record.remarks,
            })
        })
        .collect()
}

/// Commits a stage computed by the ledger against the version it was read at.
///
/// `seq` is the new length of the ledger. Returns the new version.
pub(crate) async fn commit_stage<S: Display>(
    pool: &SqlitePool,
    owner: LedgerOwner,
    reference_number: &str,
    read_version: i64,
    seq: i64,
    entry: &StageEntry<S>,
) -> DbResult<i64> {
    let conflict = || DbError::ConcurrentModification {
        reference_number: reference_number.to_string(),
        expected_version: read_version,
    };

    let mut tx = pool.begin().await.map_err(DbError::transaction)?;

    let sql = format!(
        r#"
        UPDATE {}
        SET status = ?1, version = version + 1, updated_at = ?2
        WHERE reference_number = ?3 AND version = ?4
        "#,
        owner.table()
    );
    let updated = sqlx::query(&sql)
        .bind(entry.status.to_string())
        .bind(entry.timestamp)
        .bind(reference_number)
        .bind(read_version)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if updated == 0 {
        warn!(
            reference_number = %reference_number,
            read_version,
            "Optimistic check failed on stage append"
        );
        return Err(conflict());
    }

    match insert_stage(&mut tx, reference_number, seq, entry).await {
        Ok(()) => {}
        Err(DbError::UniqueViolation { .. }) => {
            warn!(reference_number = %reference_number, seq, "Stage sequence already taken");
            return Err(conflict());
        }
        Err(err) => return Err(err),
    }

    tx.commit().await.map_err(DbError::transaction)?;

    debug!(
        reference_number = %reference_number,
        status = %entry.status,
        version = read_version + 1,
        "Stage appended"
    );
    Ok(read_version + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::complaint::NewComplaint;
    use chrono::{Duration, TimeZone};
    use portal_core::{ComplaintCategory, ComplaintStatus, ContactDetails, ServiceType};

    fn filed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 10, 9, 0, 0).unwrap()
    }

    fn entry(status: ComplaintStatus, minutes: i64) -> StageEntry<ComplaintStatus> {
        StageEntry {
            stage_name: status.to_string(),
            status,
            timestamp: filed_at() + Duration::minutes(minutes),
            remarks: None,
        }
    }

    async fn db_with_complaint() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let complaint = db
            .complaints()
            .file(
                NewComplaint {
                    service_type: ServiceType::Water,
                    category: ComplaintCategory::NoWaterSupply,
                    requested_priority: None,
                    description: "No water in the taps for two days".to_string(),
                    contact: ContactDetails {
                        name: "Lakshmi Iyer".to_string(),
                        phone: "9988776655".to_string(),
                        email: None,
                        address: "22 Temple Street, Madurai".to_string(),
                        consumer_number: None,
                    },
                },
                filed_at(),
            )
            .await
            .unwrap();
        (db, complaint.reference_number)
    }

    #[tokio::test]
    async fn test_stale_version_updates_nothing() {
        let (db, reference) = db_with_complaint().await;
        let pool = db.pool();

        let version = commit_stage(
            pool,
            LedgerOwner::Complaint,
            &reference,
            1,
            2,
            &entry(ComplaintStatus::Assigned, 5),
        )
        .await
        .unwrap();
        assert_eq!(version, 2);

        // Second writer still holding version 1
        let err = commit_stage(
            pool,
            LedgerOwner::Complaint,
            &reference,
            1,
            2,
            &entry(ComplaintStatus::InProgress, 6),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::ConcurrentModification { expected_version: 1, .. }));

        let stored = db.complaints().get(&reference).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.status, ComplaintStatus::Assigned);
        assert_eq!(stored.stage_history.len(), 2);
    }

    #[tokio::test]
    async fn test_taken_sequence_rolls_back_status_update() {
        let (db, reference) = db_with_complaint().await;
        let pool = db.pool();

        // A row at seq 2 exists while the version still reads 1
        let mut conn = pool.acquire().await.unwrap();
        insert_stage(&mut *conn, &reference, 2, &entry(ComplaintStatus::Assigned, 5))
            .await
            .unwrap();
        drop(conn);

        let err = commit_stage(
            pool,
            LedgerOwner::Complaint,
            &reference,
            1,
            2,
            &entry(ComplaintStatus::Resolved, 6),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::ConcurrentModification { .. }));

        let (status, version): (String, i64) =
            sqlx::query_as("SELECT status, version FROM complaints WHERE reference_number = ?1")
                .bind(&reference)
                .fetch_one(pool)
                .await
                .unwrap();
        assert_eq!(status, "open");
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn test_history_loads_in_sequence_order() {
        let (db, reference) = db_with_complaint().await;
        commit_stage(
            db.pool(),
            LedgerOwner::Complaint,
            &reference,
            1,
            2,
            &entry(ComplaintStatus::Resolved, 30),
        )
        .await
        .unwrap();

        let history = load_stages::<ComplaintStatus>(db.pool(), &reference).await.unwrap();
        let statuses: Vec<_> = history.iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![ComplaintStatus::Open, ComplaintStatus::Resolved]);
    }
}
