//! # Reference Number Issuer
//!
//! Mints reference and bill numbers that stay unique under concurrent
//! submissions.
//!
//! ## One Attempt
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    INSERT INTO reference_sequences (prefix, year, last_value)           │
//! │    VALUES ('NC', 2025, (count of NC records in 2025) + 1)               │
//! │    ON CONFLICT DO UPDATE SET last_value = last_value + 1                │
//! │    RETURNING last_value                          ──► 42                 │
//! │                                                                         │
//! │    INSERT INTO applications (... 'NC2025000042' ...)                    │
//! │    INSERT INTO stage_entries (... seq 1 ...)                            │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The reservation is the first statement of the transaction, so the
//! connection takes the write lock before it reads anything and concurrent
//! issuers queue behind each other instead of reading a stale counter.
//! A failed submission rolls the reservation back with everything else.
//!
//! ## Collisions
//! If the record insert hits the UNIQUE index on its number (rows imported
//! with numbers ahead of the counter), the attempt is rolled back, the
//! counter is moved to at least the colliding value, and the issuer tries
//! again, up to [`MAX_ISSUANCE_ATTEMPTS`] times.

use portal_core::reference::{format_reference, ReferenceKind};
use portal_core::MAX_ISSUANCE_ATTEMPTS;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

// =============================================================================
// Issued Records
// =============================================================================

/// A record that is inserted under a freshly issued number.
pub(crate) trait IssuedRecord {
    fn kind(&self) -> ReferenceKind;

    fn service_year(&self) -> i32;

    /// Writes the record (and anything that must commit with it) on `conn`,
    /// which is inside the issuing transaction.
    async fn insert(&self, conn: &mut SqliteConnection, reference_number: &str) -> DbResult<()>;
}

/// Issues a number for `record` and inserts it, all in one transaction.
pub(crate) async fn issue<R: IssuedRecord>(pool: &SqlitePool, record: &R) -> DbResult<String> {
    let kind = record.kind();
    let year = record.service_year();

    for attempt in 1..=MAX_ISSUANCE_ATTEMPTS {
        let mut tx = pool.begin().await.map_err(DbError::transaction)?;

        let sequence = reserve(&mut tx, kind, year).await?;
        let reference_number = format_reference(kind, year, sequence);

        match record.insert(&mut tx, &reference_number).await {
            Ok(()) => {
                tx.commit().await.map_err(DbError::transaction)?;
                debug!(reference_number = %reference_number, attempt, "Issued reference number");
                return Ok(reference_number);
            }
            Err(err) if err.is_reference_collision() => {
                tx.rollback().await?;
                warn!(
                    reference_number = %reference_number,
                    attempt,
                    "Reference number collision, advancing counter"
                );
                advance_past(pool, kind, year, sequence).await?;
            }
            Err(err) => return Err(err),
        }
    }

    Err(DbError::IssuanceFailed {
        prefix: kind.prefix().to_string(),
        year,
        attempts: MAX_ISSUANCE_ATTEMPTS,
    })
}

// =============================================================================
// Counter Statements
// =============================================================================

/// Count of records already numbered under `kind` in `?2` (the year).
fn existing_count_sql(kind: ReferenceKind) -> &'static str {
    match kind {
        ReferenceKind::Complaint => "SELECT COUNT(*) FROM complaints WHERE service_year = ?2",
        ReferenceKind::Bill => "SELECT COUNT(*) FROM bills WHERE service_year = ?2",
        _ => {
            "SELECT COUNT(*) FROM applications WHERE service_year = ?2 AND application_type = ?3"
        }
    }
}

/// Reserves the next sequence value. Single statement, never read-then-write.
async fn reserve(conn: &mut SqliteConnection, kind: ReferenceKind, year: i32) -> DbResult<i64> {
    let sql = format!(
        r#"
        INSERT INTO reference_sequences (prefix, service_year, last_value)
        VALUES (?1, ?2, ({}) + 1)
        ON CONFLICT (prefix, service_year)
        DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
        existing_count_sql(kind)
    );

    let mut query = sqlx::query_scalar::<_, i64>(&sql)
        .bind(kind.prefix())
        .bind(year);
    if let Some(application_type) = kind.application_type() {
        query = query.bind(application_type.as_str());
    }

    Ok(query.fetch_one(&mut *conn).await?)
}

/// Moves the counter to at least `sequence` so the next reservation skips it.
async fn advance_past(
    pool: &SqlitePool,
    kind: ReferenceKind,
    year: i32,
    sequence: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO reference_sequences (prefix, service_year, last_value)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (prefix, service_year)
        DO UPDATE SET last_value = MAX(last_value, excluded.last_value)
        "#,
    )
    .bind(kind.prefix())
    .bind(year)
    .bind(sequence)
    .execute(pool)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Read access to the counters, for diagnostics and tests.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Last value handed out for `kind` in `year`, `None` before the first.
    pub async fn last_value(&self, kind: ReferenceKind, year: i32) -> DbResult<Option<i64>> {
        let value = sqlx::query_scalar::<_, i64>(
            "SELECT last_value FROM reference_sequences WHERE prefix = ?1 AND service_year = ?2",
        )
        .bind(kind.prefix())
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }
}
