//! # Bill Routes
//!
//! Bill computation, persistence and payment confirmation.
//!
//! ## Compute Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  { serviceType, category, unitsConsumed | meterReading, serviceYear }   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  units = unitsConsumed, or current - previous reading                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tariffs().find_schedule(service, category, serviceYear)                │
//! │       │          └── nothing in force ──► 400 unknown category          │
//! │       ▼                                                                 │
//! │  compute_bill(schedule, units, sanctionedLoadKw)                        │
//! │       │                                                                 │
//! │       ├── /bills/compute ──► 200 BillComputation                        │
//! │       └── /bills ──────────► bills().create ──► 201 Bill (BL number)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Datelike, Utc};
use portal_core::{
    compute_bill, Bill, BillComputation, MeterReading, ServiceType, TariffCategory,
};
use portal_db::NewBill;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Inputs of a bill computation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeBillRequest {
    pub service_type: ServiceType,
    pub category: TariffCategory,
    #[serde(default)]
    pub units_consumed: Option<Decimal>,
    #[serde(default)]
    pub meter_reading: Option<MeterReading>,
    /// Selects the tariff in force; the current year when absent.
    #[serde(default)]
    pub service_year: Option<i32>,
    #[serde(default)]
    pub sanctioned_load_kw: Option<Decimal>,
}

impl ComputeBillRequest {
    /// Exactly one of `unitsConsumed` and `meterReading` must be given.
    fn units(&self) -> Result<Decimal, ApiError> {
        match (self.units_consumed, self.meter_reading) {
            (Some(units), None) => Ok(units),
            (None, Some(reading)) => Ok(reading.units_consumed()?),
            _ => Err(ApiError::validation(
                "Provide exactly one of unitsConsumed and meterReading",
            )),
        }
    }

    fn service_year(&self) -> i32 {
        self.service_year.unwrap_or_else(|| Utc::now().year())
    }
}

async fn computation(
    state: &AppState,
    request: &ComputeBillRequest,
) -> Result<BillComputation, ApiError> {
    let units = request.units()?;
    let schedule = state
        .db
        .tariffs()
        .find_schedule(request.service_type, request.category, request.service_year())
        .await?;

    let bill = compute_bill(&schedule, units, request.sanctioned_load_kw)?;
    debug!(
        service_type = %request.service_type,
        category = %request.category,
        units = %bill.units_consumed,
        total = %bill.total_amount,
        "Bill computed"
    );
    Ok(bill)
}

/// `POST /api/v1/bills/compute`
pub async fn compute(
    State(state): State<AppState>,
    body: Result<Json<ComputeBillRequest>, JsonRejection>,
) -> Result<Json<BillComputation>, ApiError> {
    let Json(request) = body?;
    Ok(Json(computation(&state, &request).await?))
}

/// Persisted-bill body: the computation inputs plus the account billed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    pub consumer_number: String,
    #[serde(flatten)]
    pub computation: ComputeBillRequest,
}

/// `POST /api/v1/bills`
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateBillRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Bill>), ApiError> {
    let Json(request) = body?;
    let computed = computation(&state, &request.computation).await?;

    let bill = state
        .db
        .bills()
        .create(
            NewBill {
                service_type: request.computation.service_type,
                category: request.computation.category,
                consumer_number: request.consumer_number,
                service_year: request.computation.service_year(),
                computation: computed,
            },
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(bill)))
}

/// Payment-confirmed event from the payment gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub payment_reference: String,
}

/// `POST /api/v1/bills/:bill_number/payment`
///
/// Replaying the same event is harmless; a second, different payment for the
/// same bill is a 409.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(bill_number): Path<String>,
    body: Result<Json<ConfirmPaymentRequest>, JsonRejection>,
) -> Result<Json<Bill>, ApiError> {
    let Json(request) = body?;
    let bill = state
        .db
        .bills()
        .confirm_payment(&bill_number, &request.payment_reference, Utc::now())
        .await?;

    Ok(Json(bill))
}
