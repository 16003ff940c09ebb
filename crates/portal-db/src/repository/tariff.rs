//! # Tariff Repository
//!
//! Persisted tariff schedules, versioned by effective year.
//!
//! ## Lookup
//! ```text
//!  tariff_schedules (electricity, residential)
//!  ┌────────────────┐
//!  │ effective 2000 │
//!  │ effective 2024 │ ◄── service year 2025 picks the latest year <= 2025
//!  │ effective 2027 │
//!  └────────────────┘
//! ```

use chrono::{DateTime, Utc};
use portal_core::tariff::{FixedCharge, Slab, TariffBook, TariffSchedule};
use portal_core::{CoreError, ServiceType, TariffCategory};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const FLAT: &str = "flat";
const PER_SANCTIONED_KW: &str = "per_sanctioned_kw";

#[derive(Debug, sqlx::FromRow)]
struct ScheduleRecord {
    id: String,
    service_type: ServiceType,
    category: TariffCategory,
    fixed_charge_kind: String,
    fixed_charge_amount: String,
    tax_percentage: String,
}

#[derive(Debug, sqlx::FromRow)]
struct SlabRecord {
    upper_bound: Option<String>,
    rate_per_unit: String,
}

fn parse_decimal(column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|e| DbError::corrupt(column, e))
}

/// Repository for tariff schedules.
#[derive(Debug, Clone)]
pub struct TariffRepository {
    pool: SqlitePool,
}

impl TariffRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TariffRepository { pool }
    }

    /// Stores `schedule` as the tariff in force from `effective_year`,
    /// replacing a schedule previously saved for the same year.
    pub async fn save_schedule(
        &self,
        schedule: &TariffSchedule,
        effective_year: i32,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        sqlx::query(
            r#"
            DELETE FROM tariff_schedules
            WHERE service_type = ?1 AND category = ?2 AND effective_year = ?3
            "#,
        )
        .bind(schedule.service())
        .bind(schedule.category())
        .bind(effective_year)
        .execute(&mut *tx)
        .await?;

        let id = Uuid::new_v4().to_string();
        let (kind, amount) = match schedule.fixed_charge() {
            FixedCharge::Flat(amount) => (FLAT, amount),
            FixedCharge::PerSanctionedKw(amount) => (PER_SANCTIONED_KW, amount),
        };

        sqlx::query(
            r#"
            INSERT INTO tariff_schedules (
                id, service_type, category, effective_year,
                fixed_charge_kind, fixed_charge_amount, tax_percentage, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&id)
        .bind(schedule.service())
        .bind(schedule.category())
        .bind(effective_year)
        .bind(kind)
        .bind(amount.to_string())
        .bind(schedule.tax_percentage().to_string())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, slab) in schedule.slabs().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO tariff_slabs (schedule_id, position, upper_bound, rate_per_unit)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(&id)
            .bind(position as i64)
            .bind(slab.upper_bound.map(|u| u.to_string()))
            .bind(slab.rate_per_unit.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(
            service_type = %schedule.service(),
            category = %schedule.category(),
            effective_year,
            slabs = schedule.slabs().len(),
            "Tariff schedule saved"
        );
        Ok(())
    }

    /// The schedule in force for `service_year`.
    ///
    /// ## Errors
    /// No schedule effective on or before that year → `UnknownCategory`.
    pub async fn find_schedule(
        &self,
        service: ServiceType,
        category: TariffCategory,
        service_year: i32,
    ) -> DbResult<TariffSchedule> {
        let record = sqlx::query_as::<_, ScheduleRecord>(
            r#"
            SELECT id, service_type, category, fixed_charge_kind,
                   fixed_charge_amount, tax_percentage
            FROM tariff_schedules
            WHERE service_type = ?1 AND category = ?2 AND effective_year <= ?3
            ORDER BY effective_year DESC
            LIMIT 1
            "#,
        )
        .bind(service)
        .bind(category)
        .bind(service_year)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::UnknownCategory {
            category: format!("{}/{}", service, category),
        })?;

        let slabs = sqlx::query_as::<_, SlabRecord>(
            r#"
            SELECT upper_bound, rate_per_unit
            FROM tariff_slabs
            WHERE schedule_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&record.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|slab| {
            Ok(Slab {
                upper_bound: slab
                    .upper_bound
                    .as_deref()
                    .map(|u| parse_decimal("tariff_slabs.upper_bound", u))
                    .transpose()?,
                rate_per_unit: parse_decimal("tariff_slabs.rate_per_unit", &slab.rate_per_unit)?,
            })
        })
        .collect::<DbResult<Vec<_>>>()?;

        let amount = parse_decimal("tariff_schedules.fixed_charge_amount", &record.fixed_charge_amount)?;
        let fixed_charge = match record.fixed_charge_kind.as_str() {
            FLAT => FixedCharge::Flat(amount),
            PER_SANCTIONED_KW => FixedCharge::PerSanctionedKw(amount),
            other => return Err(DbError::corrupt("tariff_schedules.fixed_charge_kind", other)),
        };

        Ok(TariffSchedule::new(
            record.service_type,
            record.category,
            slabs,
            fixed_charge,
            parse_decimal("tariff_schedules.tax_percentage", &record.tax_percentage)?,
        )?)
    }

    /// Every schedule in force for `service_year`.
    pub async fn load_book(&self, service_year: i32) -> DbResult<TariffBook> {
        let mut book = TariffBook::new();
        for service in ServiceType::ALL {
            for category in TariffCategory::ALL {
                if !category.is_offered_for(service) {
                    continue;
                }
                match self.find_schedule(service, category, service_year).await {
                    Ok(schedule) => book.insert(schedule),
                    Err(DbError::Core(CoreError::UnknownCategory { .. })) => {}
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(book)
    }

    /// Saves every schedule of `book` as effective from `effective_year`.
    pub async fn seed(
        &self,
        book: &TariffBook,
        effective_year: i32,
        now: DateTime<Utc>,
    ) -> DbResult<usize> {
        let mut saved = 0;
        for schedule in book.schedules() {
            self.save_schedule(schedule, effective_year, now).await?;
            saved += 1;
        }
        info!(schedules = saved, effective_year, "Tariff book seeded");
        Ok(saved)
    }

    /// Number of stored schedules across all years.
    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tariff_schedules")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use portal_core::tariff::compute_bill;
    use portal_core::Money;
    use rust_decimal_macros::dec;

    async fn repo() -> TariffRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().tariffs()
    }

    #[tokio::test]
    async fn test_schedule_round_trip() {
        let repo = repo().await;
        let standard = TariffBook::standard().unwrap();
        let saved = repo.seed(&standard, 2000, Utc::now()).await.unwrap();
        assert_eq!(saved as i64, repo.count().await.unwrap());

        let schedule = repo
            .find_schedule(ServiceType::Electricity, TariffCategory::Residential, 2025)
            .await
            .unwrap();
        assert_eq!(
            &schedule,
            standard
                .get(ServiceType::Electricity, TariffCategory::Residential)
                .unwrap()
        );

        let bill = compute_bill(&schedule, dec!(350), None).unwrap();
        assert_eq!(bill.total_amount, Money::from_paise(254625));
    }

    #[tokio::test]
    async fn test_latest_effective_year_wins() {
        let repo = repo().await;
        let old = TariffSchedule::new(
            ServiceType::Water,
            TariffCategory::Residential,
            vec![Slab::unbounded(dec!(5))],
            FixedCharge::Flat(dec!(10)),
            dec!(0),
        )
        .unwrap();
        let revised = TariffSchedule::new(
            ServiceType::Water,
            TariffCategory::Residential,
            vec![Slab::bounded(dec!(10), dec!(6)), Slab::unbounded(dec!(9))],
            FixedCharge::PerSanctionedKw(dec!(2.5)),
            dec!(5),
        )
        .unwrap();
        repo.save_schedule(&old, 2020, Utc::now()).await.unwrap();
        repo.save_schedule(&revised, 2025, Utc::now()).await.unwrap();

        let found = |year| repo.find_schedule(ServiceType::Water, TariffCategory::Residential, year);
        assert_eq!(found(2024).await.unwrap(), old);
        assert_eq!(found(2025).await.unwrap(), revised);
        assert_eq!(found(2030).await.unwrap(), revised);
        assert!(matches!(
            found(2019).await,
            Err(DbError::Core(CoreError::UnknownCategory { .. }))
        ));
    }

    #[tokio::test]
    async fn test_resave_replaces_same_year() {
        let repo = repo().await;
        let first = TariffSchedule::new(
            ServiceType::Gas,
            TariffCategory::Commercial,
            vec![Slab::unbounded(dec!(70))],
            FixedCharge::Flat(dec!(150)),
            dec!(12),
        )
        .unwrap();
        let second = TariffSchedule::new(
            ServiceType::Gas,
            TariffCategory::Commercial,
            vec![Slab::unbounded(dec!(75))],
            FixedCharge::Flat(dec!(150)),
            dec!(12),
        )
        .unwrap();

        repo.save_schedule(&first, 2025, Utc::now()).await.unwrap();
        repo.save_schedule(&second, 2025, Utc::now()).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let stored = repo
            .find_schedule(ServiceType::Gas, TariffCategory::Commercial, 2025)
            .await
            .unwrap();
        assert_eq!(stored.slabs()[0].rate_per_unit, dec!(75));
    }

    #[tokio::test]
    async fn test_load_book_skips_missing() {
        let repo = repo().await;
        assert_eq!(repo.load_book(2025).await.unwrap().schedules().count(), 0);

        repo.seed(&TariffBook::standard().unwrap(), 2000, Utc::now())
            .await
            .unwrap();
        let book = repo.load_book(2025).await.unwrap();
        assert_eq!(
            book.schedules().count(),
            TariffBook::standard().unwrap().schedules().count()
        );
    }
}
