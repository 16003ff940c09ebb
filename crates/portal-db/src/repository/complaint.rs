//! # Complaint Repository
//!
//! Database operations for consumer complaints.
//!
//! ## Complaint Flow
//! ```text
//! file() ─► CMP2025000007 { priority: from override table, status: open }
//!   │
//!   ├── append_stage(assigned / in_progress / resolved / closed)
//!   │
//!   └── reopen()  (closed only) ─► stage "Reopened", status open
//! ```

use chrono::{DateTime, Datelike, Utc};
use portal_core::lifecycle::{Ledger, LifecycleStatus};
use portal_core::priority::assign_priority;
use portal_core::validation::{validate_complaint, validate_phone};
use portal_core::{
    Complaint, ComplaintCategory, ComplaintStatus, ContactDetails, Priority, ReferenceKind,
    ServiceType, StageEntry, ValidationError,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::application::StageUpdate;
use crate::repository::sequence::{issue, IssuedRecord};
use crate::repository::stage::{commit_stage, insert_stage, load_stages, LedgerOwner};

/// A complaint as received from the portal.
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub service_type: ServiceType,
    pub category: ComplaintCategory,
    pub requested_priority: Option<Priority>,
    pub description: String,
    pub contact: ContactDetails,
}

#[derive(Debug, sqlx::FromRow)]
struct ComplaintRecord {
    id: String,
    reference_number: String,
    service_type: ServiceType,
    category: ComplaintCategory,
    priority: Priority,
    status: ComplaintStatus,
    description: String,
    contact_name: String,
    contact_phone: String,
    contact_email: Option<String>,
    contact_address: String,
    consumer_number: Option<String>,
    version: i64,
    submitted_at: DateTime<Utc>,
}

struct PendingComplaint<'a> {
    id: String,
    complaint: &'a NewComplaint,
    priority: Priority,
    phone: String,
    first_stage: StageEntry<ComplaintStatus>,
    submitted_at: DateTime<Utc>,
}

impl IssuedRecord for PendingComplaint<'_> {
    fn kind(&self) -> ReferenceKind {
        ReferenceKind::Complaint
    }

    fn service_year(&self) -> i32 {
        self.submitted_at.year()
    }

    async fn insert(&self, conn: &mut SqliteConnection, reference_number: &str) -> DbResult<()> {
        let complaint = self.complaint;
        let contact = &complaint.contact;

        sqlx::query(
            r#"
            INSERT INTO complaints (
                id, reference_number, service_type, category, priority, service_year,
                status, description, contact_name, contact_phone, contact_email,
                contact_address, consumer_number, version, submitted_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 1, ?14, ?14)
            "#,
        )
        .bind(&self.id)
        .bind(reference_number)
        .bind(complaint.service_type)
        .bind(complaint.category)
        .bind(self.priority)
        .bind(self.service_year())
        .bind(self.first_stage.status)
        .bind(complaint.description.trim())
        .bind(contact.name.trim())
        .bind(&self.phone)
        .bind(contact.email.as_deref().map(str::trim).filter(|e| !e.is_empty()))
        .bind(contact.address.trim())
        .bind(contact.consumer_number.as_deref().map(str::trim))
        .bind(self.submitted_at)
        .execute(&mut *conn)
        .await?;

        insert_stage(conn, reference_number, 1, &self.first_stage).await
    }
}

/// Repository for complaint database operations.
#[derive(Debug, Clone)]
pub struct ComplaintRepository {
    pool: SqlitePool,
}

impl ComplaintRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ComplaintRepository { pool }
    }

    /// Validates and files a complaint. Priority comes from the override
    /// table, not from the request alone.
    pub async fn file(&self, complaint: NewComplaint, now: DateTime<Utc>) -> DbResult<Complaint> {
        validate_complaint(
            complaint.service_type,
            complaint.category,
            &complaint.description,
            &complaint.contact,
        )?;

        let priority = assign_priority(complaint.category, complaint.requested_priority);
        let ledger = Ledger::initialize(
            ComplaintStatus::INITIAL,
            ComplaintStatus::INITIAL_STAGE,
            now,
        )?;
        let pending = PendingComplaint {
            id: Uuid::new_v4().to_string(),
            complaint: &complaint,
            priority,
            phone: validate_phone(&complaint.contact.phone)?,
            first_stage: ledger.last().clone(),
            submitted_at: now,
        };

        let reference_number = issue(&self.pool, &pending).await?;

        info!(
            reference_number = %reference_number,
            category = %complaint.category,
            priority = %priority,
            "Complaint filed"
        );

        let PendingComplaint { id, phone, .. } = pending;
        let mut contact = complaint.contact;
        contact.phone = phone;
        Ok(Complaint {
            id,
            reference_number,
            service_type: complaint.service_type,
            category: complaint.category,
            priority,
            status: ComplaintStatus::INITIAL,
            description: complaint.description.trim().to_string(),
            contact,
            submitted_at: now,
            version: 1,
            stage_history: ledger.into_entries(),
        })
    }

    pub async fn find(&self, reference_number: &str) -> DbResult<Option<Complaint>> {
        debug!(reference_number = %reference_number, "Loading complaint");

        let record = sqlx::query_as::<_, ComplaintRecord>(
            r#"
            SELECT id, reference_number, service_type, category, priority, status,
                   description, contact_name, contact_phone, contact_email,
                   contact_address, consumer_number, version, submitted_at
            FROM complaints
            WHERE reference_number = ?1
            "#,
        )
        .bind(reference_number.trim().to_ascii_uppercase())
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let stage_history = load_stages(&self.pool, &record.reference_number).await?;

        Ok(Some(Complaint {
            id: record.id,
            reference_number: record.reference_number,
            service_type: record.service_type,
            category: record.category,
            priority: record.priority,
            status: record.status,
            description: record.description,
            contact: ContactDetails {
                name: record.contact_name,
                phone: record.contact_phone,
                email: record.contact_email,
                address: record.contact_address,
                consumer_number: record.consumer_number,
            },
            submitted_at: record.submitted_at,
            version: record.version,
            stage_history,
        }))
    }

    pub async fn get(&self, reference_number: &str) -> DbResult<Complaint> {
        self.find(reference_number)
            .await?
            .ok_or_else(|| DbError::not_found("Complaint", reference_number))
    }

    /// Appends a stage to a complaint's ledger.
    pub async fn append_stage(
        &self,
        reference_number: &str,
        update: StageUpdate<ComplaintStatus>,
        now: DateTime<Utc>,
    ) -> DbResult<Complaint> {
        let new_status = update.new_status.ok_or_else(|| ValidationError::Required {
            field: "new_status".to_string(),
        })?;
        let stage_name = update.stage_name;
        let remarks = update.remarks;

        self.record(reference_number, update.expected_version, |ledger| {
            ledger.append(stage_name.as_deref(), new_status, remarks.as_deref(), now)
        })
        .await
    }

    /// Reopens a closed complaint.
    pub async fn reopen(
        &self,
        reference_number: &str,
        remarks: Option<&str>,
        expected_version: Option<i64>,
        now: DateTime<Utc>,
    ) -> DbResult<Complaint> {
        let complaint = self
            .record(reference_number, expected_version, |ledger| {
                ledger.reopen(remarks, now)
            })
            .await?;

        info!(reference_number = %reference_number, "Complaint reopened");
        Ok(complaint)
    }

    /// Runs one ledger step against the stored history and commits it.
    async fn record<F>(
        &self,
        reference_number: &str,
        expected_version: Option<i64>,
        step: F,
    ) -> DbResult<Complaint>
    where
        F: FnOnce(&mut Ledger<ComplaintStatus>) -> portal_core::CoreResult<StageEntry<ComplaintStatus>>,
    {
        let mut complaint = self.get(reference_number).await?;
        if let Some(expected) = expected_version {
            if expected != complaint.version {
                return Err(DbError::ConcurrentModification {
                    reference_number: complaint.reference_number,
                    expected_version: expected,
                });
            }
        }

        let mut ledger = Ledger::from_entries(std::mem::take(&mut complaint.stage_history))?;
        let entry = step(&mut ledger)?;

        complaint.version = commit_stage(
            &self.pool,
            LedgerOwner::Complaint,
            &complaint.reference_number,
            complaint.version,
            ledger.len() as i64,
            &entry,
        )
        .await?;

        info!(
            reference_number = %complaint.reference_number,
            status = %entry.status,
            terminal = entry.status.is_terminal(),
            "Complaint stage recorded"
        );

        complaint.status = entry.status;
        complaint.stage_history = ledger.into_entries();
        Ok(complaint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{Duration, TimeZone};
    use portal_core::CoreError;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 2, 8, 30, 0).unwrap()
    }

    fn outage(requested: Option<Priority>) -> NewComplaint {
        NewComplaint {
            service_type: ServiceType::Electricity,
            category: ComplaintCategory::PowerOutage,
            requested_priority: requested,
            description: "No power on the entire street since 6 am".to_string(),
            contact: ContactDetails {
                name: "Ravi Kumar".to_string(),
                phone: "+91 98123 45678".to_string(),
                email: None,
                address: "4th Cross, Jayanagar".to_string(),
                consumer_number: Some("EL-100200".to_string()),
            },
        }
    }

    async fn repo() -> ComplaintRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().complaints()
    }

    #[tokio::test]
    async fn test_file_applies_priority_override() {
        let repo = repo().await;
        let complaint = repo.file(outage(Some(Priority::Low)), now()).await.unwrap();

        assert_eq!(complaint.reference_number, "CMP2025000001");
        assert_eq!(complaint.priority, Priority::High);
        assert_eq!(complaint.status, ComplaintStatus::Open);
        assert_eq!(complaint.contact.phone, "9812345678");

        let stored = repo.get("CMP2025000001").await.unwrap();
        assert_eq!(stored.priority, Priority::High);
        assert_eq!(stored.stage_history.len(), 1);
        assert_eq!(stored.contact, complaint.contact);
    }

    #[tokio::test]
    async fn test_requested_priority_kept_without_override() {
        let repo = repo().await;
        let mut complaint = outage(Some(Priority::Low));
        complaint.category = ComplaintCategory::BillingDispute;

        let filed = repo.file(complaint, now()).await.unwrap();
        assert_eq!(filed.priority, Priority::Low);
    }

    #[tokio::test]
    async fn test_close_and_reopen() {
        let repo = repo().await;
        let filed = repo.file(outage(None), now()).await.unwrap();
        let reference = filed.reference_number.as_str();

        repo.append_stage(reference, StageUpdate::to(ComplaintStatus::Assigned), now())
            .await
            .unwrap();
        repo.append_stage(reference, StageUpdate::to(ComplaintStatus::Closed), now())
            .await
            .unwrap();

        let err = repo
            .append_stage(reference, StageUpdate::to(ComplaintStatus::Open), now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::TerminalState { .. })));

        let reopened = repo
            .reopen(reference, Some("Fault recurred"), Some(3), now() + Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(reopened.status, ComplaintStatus::Open);
        assert_eq!(reopened.version, 4);

        let stored = repo.get(reference).await.unwrap();
        assert_eq!(stored.stage_history.len(), 4);
        assert_eq!(stored.stage_history[3].stage_name, "Reopened");
        assert_eq!(stored.stage_history[3].remarks.as_deref(), Some("Fault recurred"));
    }

    #[tokio::test]
    async fn test_reopen_requires_closed() {
        let repo = repo().await;
        let filed = repo.file(outage(None), now()).await.unwrap();

        let err = repo
            .reopen(&filed.reference_number, None, None, now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_category_must_match_service() {
        let repo = repo().await;
        let mut complaint = outage(None);
        complaint.service_type = ServiceType::Gas;

        let err = repo.file(complaint, now()).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ServiceMismatch { .. })));
    }
}
