//! # Application Repository
//!
//! Database operations for consumer applications.
//!
//! ## Application Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Application Lifecycle                             │
//! │                                                                         │
//! │  1. SUBMIT                                                              │
//! │     └── submit() → NC2025000001 { status: submitted, version: 1 }       │
//! │         (record + documents + first stage + number in one tx)           │
//! │                                                                         │
//! │  2. STAFF PROGRESS                                                      │
//! │     └── append_stage(document_verification) → version 2                 │
//! │     └── append_stage(approved)              → version 3                 │
//! │                                                                         │
//! │  3. TERMINAL                                                            │
//! │     └── completed / rejected: further appends fail                      │
//! │                                                                         │
//! │  Nothing is deleted; the history is the audit trail.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, Utc};
use portal_core::lifecycle::{Ledger, LifecycleStatus};
use portal_core::validation::{validate_application, validate_documents};
use portal_core::{
    Application, ApplicationPayload, ApplicationStatus, ApplicationType, DocumentRef,
    ReferenceKind, ServiceType, StageEntry,
};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::sequence::{issue, IssuedRecord};
use crate::repository::stage::{commit_stage, insert_stage, load_stages, LedgerOwner};

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// A submission as received from the portal.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub service_type: ServiceType,
    pub payload: ApplicationPayload,
    pub documents: Vec<DocumentRef>,
}

/// A staff action on a record's ledger.
#[derive(Debug, Clone, Default)]
pub struct StageUpdate<S> {
    pub new_status: Option<S>,
    pub stage_name: Option<String>,
    pub remarks: Option<String>,
    /// Version the caller last saw; a mismatch fails fast.
    pub expected_version: Option<i64>,
}

impl<S> StageUpdate<S> {
    pub fn to(new_status: S) -> Self {
        StageUpdate {
            new_status: Some(new_status),
            stage_name: None,
            remarks: None,
            expected_version: None,
        }
    }

    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn expected_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// One line of the staff work queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub reference_number: String,
    pub service_type: ServiceType,
    pub application_type: ApplicationType,
    pub status: ApplicationStatus,
    pub applicant_name: String,
    pub version: i64,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ApplicationRecord {
    id: String,
    reference_number: String,
    service_type: ServiceType,
    status: ApplicationStatus,
    payload: String,
    version: i64,
    submitted_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRecord {
    name: String,
    mime_type: String,
    size_bytes: i64,
    storage_ref: String,
}

/// Row set written under a freshly issued number.
struct PendingApplication<'a> {
    id: String,
    application: &'a NewApplication,
    payload_json: String,
    first_stage: StageEntry<ApplicationStatus>,
    submitted_at: DateTime<Utc>,
}

impl IssuedRecord for PendingApplication<'_> {
    fn kind(&self) -> ReferenceKind {
        ReferenceKind::from(self.application.payload.application_type())
    }

    fn service_year(&self) -> i32 {
        self.submitted_at.year()
    }

    async fn insert(&self, conn: &mut SqliteConnection, reference_number: &str) -> DbResult<()> {
        let application = self.application;

        sqlx::query(
            r#"
            INSERT INTO applications (
                id, reference_number, service_type, application_type, service_year,
                status, payload, applicant_name, version, submitted_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)
            "#,
        )
        .bind(&self.id)
        .bind(reference_number)
        .bind(application.service_type)
        .bind(application.payload.application_type())
        .bind(self.service_year())
        .bind(self.first_stage.status)
        .bind(&self.payload_json)
        .bind(application.payload.applicant().full_name.trim())
        .bind(self.submitted_at)
        .execute(&mut *conn)
        .await?;

        for (position, document) in application.documents.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO application_documents (
                    id, application_id, position, name, mime_type, size_bytes, storage_ref
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&self.id)
            .bind(position as i64)
            .bind(document.name.trim())
            .bind(&document.mime_type)
            .bind(document.size_bytes)
            .bind(document.storage_ref.trim())
            .execute(&mut *conn)
            .await?;
        }

        insert_stage(conn, reference_number, 1, &self.first_stage).await
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for application database operations.
#[derive(Debug, Clone)]
pub struct ApplicationRepository {
    pool: SqlitePool,
}

impl ApplicationRepository {
    /// Creates a new ApplicationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ApplicationRepository { pool }
    }

    /// Validates and stores a new application under a new reference number.
    ///
    /// The service year is the calendar year of `now`.
    pub async fn submit(&self, application: NewApplication, now: DateTime<Utc>) -> DbResult<Application> {
        validate_application(application.service_type, &application.payload)?;
        validate_documents(&application.documents)?;

        let ledger = Ledger::initialize(
            ApplicationStatus::INITIAL,
            ApplicationStatus::INITIAL_STAGE,
            now,
        )?;
        let pending = PendingApplication {
            id: Uuid::new_v4().to_string(),
            application: &application,
            payload_json: serde_json::to_string(&application.payload)
                .map_err(|e| DbError::Internal(e.to_string()))?,
            first_stage: ledger.last().clone(),
            submitted_at: now,
        };

        let reference_number = issue(&self.pool, &pending).await?;

        info!(
            reference_number = %reference_number,
            service_type = %application.service_type,
            application_type = %application.payload.application_type(),
            "Application submitted"
        );

        Ok(Application {
            id: pending.id,
            reference_number,
            service_type: application.service_type,
            payload: application.payload,
            status: ApplicationStatus::INITIAL,
            submitted_at: now,
            version: 1,
            stage_history: ledger.into_entries(),
            documents: application.documents,
        })
    }

    /// Gets an application with its history and documents.
    pub async fn find(&self, reference_number: &str) -> DbResult<Option<Application>> {
        debug!(reference_number = %reference_number, "Loading application");

        let record = sqlx::query_as::<_, ApplicationRecord>(
            r#"
            SELECT id, reference_number, service_type, status, payload, version, submitted_at
            FROM applications
            WHERE reference_number = ?1
            "#,
        )
        .bind(reference_number.trim().to_ascii_uppercase())
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let payload: ApplicationPayload = serde_json::from_str(&record.payload)
            .map_err(|e| DbError::corrupt("application payload", e))?;

        let documents = sqlx::query_as::<_, DocumentRecord>(
            r#"
            SELECT name, mime_type, size_bytes, storage_ref
            FROM application_documents
            WHERE application_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&record.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|d| DocumentRef {
            name: d.name,
            mime_type: d.mime_type,
            size_bytes: d.size_bytes,
            storage_ref: d.storage_ref,
        })
        .collect();

        let stage_history = load_stages(&self.pool, &record.reference_number).await?;

        Ok(Some(Application {
            id: record.id,
            reference_number: record.reference_number,
            service_type: record.service_type,
            payload,
            status: record.status,
            submitted_at: record.submitted_at,
            version: record.version,
            stage_history,
            documents,
        }))
    }

    /// Like [`find`](Self::find), but a missing record is `NotFound`.
    pub async fn get(&self, reference_number: &str) -> DbResult<Application> {
        self.find(reference_number)
            .await?
            .ok_or_else(|| DbError::not_found("Application", reference_number))
    }

    /// Appends a stage to an application's ledger.
    ///
    /// ## Errors
    /// - unknown reference → `NotFound`
    /// - stale `expected_version` or a concurrent writer → `ConcurrentModification`
    /// - `TerminalState` / `InvalidTransition` / `Validation` from the ledger
    pub async fn append_stage(
        &self,
        reference_number: &str,
        update: StageUpdate<ApplicationStatus>,
        now: DateTime<Utc>,
    ) -> DbResult<Application> {
        let mut application = self.get(reference_number).await?;
        if let Some(expected) = update.expected_version {
            if expected != application.version {
                return Err(DbError::ConcurrentModification {
                    reference_number: application.reference_number,
                    expected_version: expected,
                });
            }
        }
        let new_status = update.new_status.ok_or_else(|| {
            portal_core::ValidationError::Required {
                field: "new_status".to_string(),
            }
        })?;

        let mut ledger = Ledger::from_entries(std::mem::take(&mut application.stage_history))?;
        let entry = ledger.append(
            update.stage_name.as_deref(),
            new_status,
            update.remarks.as_deref(),
            now,
        )?;

        application.version = commit_stage(
            &self.pool,
            LedgerOwner::Application,
            &application.reference_number,
            application.version,
            ledger.len() as i64,
            &entry,
        )
        .await?;

        info!(
            reference_number = %application.reference_number,
            status = %entry.status,
            terminal = entry.status.is_terminal(),
            "Application stage recorded"
        );

        application.status = entry.status;
        application.stage_history = ledger.into_entries();
        Ok(application)
    }

    /// Staff work queue, oldest first, optionally filtered by status.
    pub async fn list(
        &self,
        status: Option<ApplicationStatus>,
        limit: i64,
    ) -> DbResult<Vec<ApplicationSummary>> {
        let summaries = sqlx::query_as::<_, ApplicationSummary>(
            r#"
            SELECT reference_number, service_type, application_type, status,
                   applicant_name, version, submitted_at, updated_at
            FROM applications
            WHERE ?1 IS NULL OR status = ?1
            ORDER BY submitted_at, reference_number
            LIMIT ?2
            "#,
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }

    /// Number of applications of one type filed in one service year.
    pub async fn count_for_year(&self, application_type: ApplicationType, year: i32) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM applications WHERE application_type = ?1 AND service_year = ?2",
        )
        .bind(application_type)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
