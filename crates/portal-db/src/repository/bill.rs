//! # Bill Repository
//!
//! Persists computed bills under an issued `BL` number and records payment.
//!
//! ## Payment State
//! ```text
//!            confirm_payment(ref)
//!  ┌────────┐ ───────────────────► ┌──────┐ ── same ref ──► unchanged bill
//!  │ unpaid │                      │ paid │
//!  └────────┘                      └──────┘ ── other ref ─► AlreadyPaid
//! ```

use chrono::{DateTime, Utc};
use portal_core::reference::ReferenceKind;
use portal_core::tariff::BillComputation;
use portal_core::validation::{validate_consumer_number, validate_service_year};
use portal_core::{Bill, BillStatus, Money, ServiceType, TariffCategory, ValidationError};
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use super::sequence::{issue, IssuedRecord};
use crate::error::{DbError, DbResult};

/// Longest accepted payment reference.
pub const PAYMENT_REFERENCE_MAX_LEN: usize = 64;

/// Input for [`BillRepository::create`].
#[derive(Debug, Clone)]
pub struct NewBill {
    pub service_type: ServiceType,
    pub category: TariffCategory,
    pub consumer_number: String,
    pub service_year: i32,
    pub computation: BillComputation,
}

#[derive(Debug, sqlx::FromRow)]
struct BillRecord {
    id: String,
    bill_number: String,
    service_type: ServiceType,
    category: TariffCategory,
    consumer_number: String,
    service_year: i32,
    units_consumed: String,
    energy_paise: i64,
    fixed_paise: i64,
    subtotal_paise: i64,
    tax_paise: i64,
    total_paise: i64,
    status: BillStatus,
    payment_reference: Option<String>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl BillRecord {
    fn into_bill(self) -> DbResult<Bill> {
        let units_consumed = Decimal::from_str(&self.units_consumed)
            .map_err(|e| DbError::corrupt("bills.units_consumed", e))?;
        Ok(Bill {
            id: self.id,
            bill_number: self.bill_number,
            service_type: self.service_type,
            category: self.category,
            consumer_number: self.consumer_number,
            service_year: self.service_year,
            units_consumed,
            energy_charges: Money::from_paise(self.energy_paise),
            fixed_charges: Money::from_paise(self.fixed_paise),
            subtotal: Money::from_paise(self.subtotal_paise),
            tax_amount: Money::from_paise(self.tax_paise),
            total_amount: Money::from_paise(self.total_paise),
            status: self.status,
            payment_reference: self.payment_reference,
            created_at: self.created_at,
            paid_at: self.paid_at,
        })
    }
}

struct PendingBill<'a> {
    id: String,
    bill: &'a NewBill,
    consumer_number: String,
    now: DateTime<Utc>,
}

impl IssuedRecord for PendingBill<'_> {
    fn kind(&self) -> ReferenceKind {
        ReferenceKind::Bill
    }

    fn service_year(&self) -> i32 {
        self.bill.service_year
    }

    async fn insert(&self, conn: &mut SqliteConnection, reference_number: &str) -> DbResult<()> {
        let computation = &self.bill.computation;
        sqlx::query(
            r#"
            INSERT INTO bills (
                id, bill_number, service_type, category, consumer_number, service_year,
                units_consumed, energy_paise, fixed_paise, subtotal_paise, tax_paise,
                total_paise, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&self.id)
        .bind(reference_number)
        .bind(self.bill.service_type)
        .bind(self.bill.category)
        .bind(&self.consumer_number)
        .bind(self.bill.service_year)
        .bind(computation.units_consumed.to_string())
        .bind(computation.energy_charges.paise())
        .bind(computation.fixed_charges.paise())
        .bind(computation.subtotal.paise())
        .bind(computation.tax_amount.paise())
        .bind(computation.total_amount.paise())
        .bind(BillStatus::Unpaid)
        .bind(self.now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

fn validate_payment_reference(payment_reference: &str) -> Result<&str, ValidationError> {
    let trimmed = payment_reference.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "paymentReference".to_string(),
        });
    }
    if trimmed.chars().count() > PAYMENT_REFERENCE_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: "paymentReference".to_string(),
            max: PAYMENT_REFERENCE_MAX_LEN,
        });
    }
    Ok(trimmed)
}

/// Repository for persisted bills.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Persists a computed bill and issues its `BL` number.
    pub async fn create(&self, bill: NewBill, now: DateTime<Utc>) -> DbResult<Bill> {
        let consumer_number = bill.consumer_number.trim().to_ascii_uppercase();
        validate_consumer_number(&consumer_number)?;
        validate_service_year(bill.service_year)?;

        let pending = PendingBill {
            id: Uuid::new_v4().to_string(),
            bill: &bill,
            consumer_number,
            now,
        };
        let bill_number = issue(&self.pool, &pending).await?;

        info!(
            bill_number = %bill_number,
            consumer_number = %pending.consumer_number,
            total = %bill.computation.total_amount,
            "Bill created"
        );
        self.get(&bill_number).await
    }

    pub async fn find(&self, bill_number: &str) -> DbResult<Option<Bill>> {
        let record = sqlx::query_as::<_, BillRecord>(
            r#"
            SELECT id, bill_number, service_type, category, consumer_number, service_year,
                   units_consumed, energy_paise, fixed_paise, subtotal_paise, tax_paise,
                   total_paise, status, payment_reference, created_at, paid_at
            FROM bills
            WHERE bill_number = ?1
            "#,
        )
        .bind(bill_number.trim().to_ascii_uppercase())
        .fetch_optional(&self.pool)
        .await?;

        record.map(BillRecord::into_bill).transpose()
    }

    pub async fn get(&self, bill_number: &str) -> DbResult<Bill> {
        self.find(bill_number)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", bill_number))
    }

    /// Marks a bill paid.
    ///
    /// Confirming again with the same payment reference returns the bill
    /// unchanged; a different reference fails with `AlreadyPaid`.
    pub async fn confirm_payment(
        &self,
        bill_number: &str,
        payment_reference: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Bill> {
        let payment_reference = validate_payment_reference(payment_reference)?;
        let bill_number = bill_number.trim().to_ascii_uppercase();

        let updated = sqlx::query(
            r#"
            UPDATE bills
            SET status = ?1, payment_reference = ?2, paid_at = ?3
            WHERE bill_number = ?4 AND status = ?5
            "#,
        )
        .bind(BillStatus::Paid)
        .bind(payment_reference)
        .bind(now)
        .bind(&bill_number)
        .bind(BillStatus::Unpaid)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let bill = self.get(&bill_number).await?;
        if updated == 1 {
            info!(
                bill_number = %bill_number,
                payment_reference = %payment_reference,
                "Bill paid"
            );
            return Ok(bill);
        }

        match bill.payment_reference.as_deref() {
            Some(existing) if existing == payment_reference => {
                debug!(bill_number = %bill_number, "Payment already confirmed");
                Ok(bill)
            }
            existing => Err(DbError::AlreadyPaid {
                bill_number,
                payment_reference: existing.unwrap_or_default().to_string(),
            }),
        }
    }

    /// Bills stored for `year`.
    pub async fn count_for_year(&self, year: i32) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bills WHERE service_year = ?1")
            .bind(year)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
