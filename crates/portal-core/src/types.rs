//! # Domain Types
//!
//! Core domain types used throughout the Utility Portal.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Application   │   │    Complaint    │   │      Bill       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  reference_no   │   │  reference_no   │   │  bill_number    │       │
//! │  │  service_type   │   │  category       │   │  units_consumed │       │
//! │  │  payload (enum) │   │  priority       │   │  total (Money)  │       │
//! │  │  status         │   │  status         │   │  status         │       │
//! │  │  stage_history  │   │  stage_history  │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  StageEntry<S> { stage_name, status: S, timestamp, remarks }            │
//! │  S = ApplicationStatus | ComplaintStatus                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every persisted entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: reference number / bill number - human-readable, issued once

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::money::Money;

fn not_allowed(field: &str, allowed: &[&str]) -> ValidationError {
    ValidationError::NotAllowed {
        field: field.to_string(),
        allowed: allowed.iter().map(|s| s.to_string()).collect(),
    }
}

// =============================================================================
// Service Type
// =============================================================================

/// The utility a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Electricity,
    Water,
    Gas,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [ServiceType::Electricity, ServiceType::Water, ServiceType::Gas];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Electricity => "electricity",
            ServiceType::Water => "water",
            ServiceType::Gas => "gas",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|service| service.as_str() == s)
            .ok_or_else(|| not_allowed("service_type", &["electricity", "water", "gas"]))
    }
}

// =============================================================================
// Tariff Category
// =============================================================================

/// Consumer category a tariff schedule is published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TariffCategory {
    Residential,
    Commercial,
    Industrial,
    Agricultural,
}

impl TariffCategory {
    pub const ALL: [TariffCategory; 4] = [
        TariffCategory::Residential,
        TariffCategory::Commercial,
        TariffCategory::Industrial,
        TariffCategory::Agricultural,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            TariffCategory::Residential => "residential",
            TariffCategory::Commercial => "commercial",
            TariffCategory::Industrial => "industrial",
            TariffCategory::Agricultural => "agricultural",
        }
    }

    /// Agricultural pump-set tariffs only exist for electricity.
    pub const fn is_offered_for(&self, service: ServiceType) -> bool {
        match self {
            TariffCategory::Agricultural => matches!(service, ServiceType::Electricity),
            _ => true,
        }
    }
}

impl fmt::Display for TariffCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown category strings are a tariff lookup failure, not a form error.
impl FromStr for TariffCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TariffCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| CoreError::UnknownCategory {
                category: s.to_string(),
            })
    }
}

// =============================================================================
// Application Type
// =============================================================================

/// Kind of application a consumer can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    NewConnection,
    ChangeOfName,
    Reconnection,
    LoadChange,
    CylinderBooking,
}

impl ApplicationType {
    pub const ALL: [ApplicationType; 5] = [
        ApplicationType::NewConnection,
        ApplicationType::ChangeOfName,
        ApplicationType::Reconnection,
        ApplicationType::LoadChange,
        ApplicationType::CylinderBooking,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ApplicationType::NewConnection => "new_connection",
            ApplicationType::ChangeOfName => "change_of_name",
            ApplicationType::Reconnection => "reconnection",
            ApplicationType::LoadChange => "load_change",
            ApplicationType::CylinderBooking => "cylinder_booking",
        }
    }

    /// Load changes are electricity-only; cylinder bookings are gas-only.
    pub const fn is_offered_for(&self, service: ServiceType) -> bool {
        match self {
            ApplicationType::LoadChange => matches!(service, ServiceType::Electricity),
            ApplicationType::CylinderBooking => matches!(service, ServiceType::Gas),
            _ => true,
        }
    }
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = ApplicationType::ALL.iter().map(|k| k.as_str()).collect();
                not_allowed("application_type", &allowed)
            })
    }
}

// =============================================================================
// Statuses
// =============================================================================

/// Status of an application. The string forms are part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    DocumentVerification,
    SiteInspection,
    ApprovalPending,
    Approved,
    Rejected,
    WorkInProgress,
    Completed,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::DocumentVerification,
        ApplicationStatus::SiteInspection,
        ApplicationStatus::ApprovalPending,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::WorkInProgress,
        ApplicationStatus::Completed,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::DocumentVerification => "document_verification",
            ApplicationStatus::SiteInspection => "site_inspection",
            ApplicationStatus::ApprovalPending => "approval_pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::WorkInProgress => "work_in_progress",
            ApplicationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = ApplicationStatus::ALL.iter().map(|s| s.as_str()).collect();
                not_allowed("status", &allowed)
            })
    }
}

/// Status of a complaint. The string forms are part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Open,
    Assigned,
    InProgress,
    Resolved,
    Closed,
}

impl ComplaintStatus {
    pub const ALL: [ComplaintStatus; 5] = [
        ComplaintStatus::Open,
        ComplaintStatus::Assigned,
        ComplaintStatus::InProgress,
        ComplaintStatus::Resolved,
        ComplaintStatus::Closed,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Open => "open",
            ComplaintStatus::Assigned => "assigned",
            ComplaintStatus::InProgress => "in_progress",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComplaintStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = ComplaintStatus::ALL.iter().map(|s| s.as_str()).collect();
                not_allowed("status", &allowed)
            })
    }
}

// =============================================================================
// Complaint Category & Priority
// =============================================================================

/// What a complaint is about. Some categories only exist for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintCategory {
    // Electricity
    PowerOutage,
    VoltageFluctuation,
    MeterBurnt,
    LiveWireHazard,
    StreetLight,
    // Water
    NoWaterSupply,
    ContaminatedWater,
    PipeLeakage,
    LowPressure,
    // Gas
    GasLeak,
    SupplyInterrupted,
    CylinderNotDelivered,
    // Any service
    MeterFaulty,
    BillingDispute,
    ConnectionDelay,
    Other,
}

impl ComplaintCategory {
    pub const ALL: [ComplaintCategory; 16] = [
        ComplaintCategory::PowerOutage,
        ComplaintCategory::VoltageFluctuation,
        ComplaintCategory::MeterBurnt,
        ComplaintCategory::LiveWireHazard,
        ComplaintCategory::StreetLight,
        ComplaintCategory::NoWaterSupply,
        ComplaintCategory::ContaminatedWater,
        ComplaintCategory::PipeLeakage,
        ComplaintCategory::LowPressure,
        ComplaintCategory::GasLeak,
        ComplaintCategory::SupplyInterrupted,
        ComplaintCategory::CylinderNotDelivered,
        ComplaintCategory::MeterFaulty,
        ComplaintCategory::BillingDispute,
        ComplaintCategory::ConnectionDelay,
        ComplaintCategory::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ComplaintCategory::PowerOutage => "power_outage",
            ComplaintCategory::VoltageFluctuation => "voltage_fluctuation",
            ComplaintCategory::MeterBurnt => "meter_burnt",
            ComplaintCategory::LiveWireHazard => "live_wire_hazard",
            ComplaintCategory::StreetLight => "street_light",
            ComplaintCategory::NoWaterSupply => "no_water_supply",
            ComplaintCategory::ContaminatedWater => "contaminated_water",
            ComplaintCategory::PipeLeakage => "pipe_leakage",
            ComplaintCategory::LowPressure => "low_pressure",
            ComplaintCategory::GasLeak => "gas_leak",
            ComplaintCategory::SupplyInterrupted => "supply_interrupted",
            ComplaintCategory::CylinderNotDelivered => "cylinder_not_delivered",
            ComplaintCategory::MeterFaulty => "meter_faulty",
            ComplaintCategory::BillingDispute => "billing_dispute",
            ComplaintCategory::ConnectionDelay => "connection_delay",
            ComplaintCategory::Other => "other",
        }
    }

    /// The service a category is restricted to, `None` for shared categories.
    pub const fn service(&self) -> Option<ServiceType> {
        match self {
            ComplaintCategory::PowerOutage
            | ComplaintCategory::VoltageFluctuation
            | ComplaintCategory::MeterBurnt
            | ComplaintCategory::LiveWireHazard
            | ComplaintCategory::StreetLight => Some(ServiceType::Electricity),
            ComplaintCategory::NoWaterSupply
            | ComplaintCategory::ContaminatedWater
            | ComplaintCategory::PipeLeakage
            | ComplaintCategory::LowPressure => Some(ServiceType::Water),
            ComplaintCategory::GasLeak
            | ComplaintCategory::SupplyInterrupted
            | ComplaintCategory::CylinderNotDelivered => Some(ServiceType::Gas),
            ComplaintCategory::MeterFaulty
            | ComplaintCategory::BillingDispute
            | ComplaintCategory::ConnectionDelay
            | ComplaintCategory::Other => None,
        }
    }

    pub fn is_offered_for(&self, service: ServiceType) -> bool {
        self.service().map_or(true, |only| only == service)
    }
}

impl fmt::Display for ComplaintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComplaintCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = ComplaintCategory::ALL.iter().map(|c| c.as_str()).collect();
                not_allowed("category", &allowed)
            })
    }
}

/// Complaint handling priority, ordered from least to most pressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| not_allowed("priority", &["low", "medium", "high", "urgent"]))
    }
}

// =============================================================================
// Stage Entry
// =============================================================================

/// One row of a record's stage history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageEntry<S> {
    pub stage_name: String,
    pub status: S,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

// =============================================================================
// Documents
// =============================================================================

/// Metadata of an uploaded supporting document. The bytes live elsewhere;
/// `storage_ref` is the opaque handle the upload service returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_ref: String,
}

// =============================================================================
// Application Payloads
// =============================================================================

/// Who is applying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantDetails {
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Where the service is (to be) delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremisesAddress {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub pin_code: String,
}

/// Why a connection is changing hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameChangeReason {
    Sale,
    Inheritance,
    Tenancy,
    Other,
}

/// Type-specific application data, tagged by `applicationType`.
///
/// ## Wire Shape
/// ```json
/// { "applicationType": "new_connection", "payload": { "applicant": {...}, ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "applicationType", content = "payload", rename_all = "snake_case")]
pub enum ApplicationPayload {
    #[serde(rename_all = "camelCase")]
    NewConnection {
        applicant: ApplicantDetails,
        premises: PremisesAddress,
        category: TariffCategory,
        /// Required for electricity; ignored by water and gas.
        #[serde(default)]
        requested_load_kw: Option<Decimal>,
    },
    #[serde(rename_all = "camelCase")]
    ChangeOfName {
        applicant: ApplicantDetails,
        consumer_number: String,
        current_name: String,
        reason: NameChangeReason,
    },
    #[serde(rename_all = "camelCase")]
    Reconnection {
        applicant: ApplicantDetails,
        consumer_number: String,
        dues_cleared: bool,
    },
    #[serde(rename_all = "camelCase")]
    LoadChange {
        applicant: ApplicantDetails,
        consumer_number: String,
        current_load_kw: Decimal,
        requested_load_kw: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    CylinderBooking {
        applicant: ApplicantDetails,
        consumer_number: String,
        cylinder_count: u8,
        delivery_address: PremisesAddress,
    },
}

impl ApplicationPayload {
    /// The tag of this payload.
    pub const fn application_type(&self) -> ApplicationType {
        match self {
            ApplicationPayload::NewConnection { .. } => ApplicationType::NewConnection,
            ApplicationPayload::ChangeOfName { .. } => ApplicationType::ChangeOfName,
            ApplicationPayload::Reconnection { .. } => ApplicationType::Reconnection,
            ApplicationPayload::LoadChange { .. } => ApplicationType::LoadChange,
            ApplicationPayload::CylinderBooking { .. } => ApplicationType::CylinderBooking,
        }
    }

    pub fn applicant(&self) -> &ApplicantDetails {
        match self {
            ApplicationPayload::NewConnection { applicant, .. }
            | ApplicationPayload::ChangeOfName { applicant, .. }
            | ApplicationPayload::Reconnection { applicant, .. }
            | ApplicationPayload::LoadChange { applicant, .. }
            | ApplicationPayload::CylinderBooking { applicant, .. } => applicant,
        }
    }
}

// =============================================================================
// Application & Complaint
// =============================================================================

/// A consumer application with its full stage history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub reference_number: String,
    pub service_type: ServiceType,
    #[serde(flatten)]
    pub payload: ApplicationPayload,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub version: i64,
    pub stage_history: Vec<StageEntry<ApplicationStatus>>,
    pub documents: Vec<DocumentRef>,
}

impl Application {
    pub fn application_type(&self) -> ApplicationType {
        self.payload.application_type()
    }
}

/// How to reach the person who raised a complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    #[serde(default)]
    pub consumer_number: Option<String>,
}

/// A consumer complaint with its full stage history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: String,
    pub reference_number: String,
    pub service_type: ServiceType,
    pub category: ComplaintCategory,
    pub priority: Priority,
    pub status: ComplaintStatus,
    pub description: String,
    pub contact: ContactDetails,
    pub submitted_at: DateTime<Utc>,
    pub version: i64,
    pub stage_history: Vec<StageEntry<ComplaintStatus>>,
}

// =============================================================================
// Bills
// =============================================================================

/// Payment state of a persisted bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Unpaid,
    Paid,
}

impl Default for BillStatus {
    fn default() -> Self {
        BillStatus::Unpaid
    }
}

/// A bill generated from a reading and persisted for payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    pub bill_number: String,
    pub service_type: ServiceType,
    pub category: TariffCategory,
    pub consumer_number: String,
    pub service_year: i32,
    pub units_consumed: Decimal,
    pub energy_charges: Money,
    pub fixed_charges: Money,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub status: BillStatus,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================
