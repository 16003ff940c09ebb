//! # portal-core: Pure Business Logic for the Utility Portal
//!
//! Billing and application-lifecycle rules for electricity, water and gas
//! services, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Utility Portal Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    portal-api (axum)                            │   │
//! │  │   applications, complaints, tracking, bills, health             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ portal-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │   │
//! │  │   │  tariff   │  │ lifecycle │  │ reference │  │ validation│   │   │
//! │  │   │  slabs    │  │  Ledger   │  │  NC/CMP/  │  │  fields   │   │   │
//! │  │   │  bills    │  │  tables   │  │  BL ...   │  │  docs     │   │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │   │
//! │  │          money • priority • types • error                       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   portal-db (Database Layer)                    │   │
//! │  │      SQLite, migrations, sequence issuer, repositories          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Application, Complaint, Bill, statuses)
//! - [`money`] - Money type in paise, the only decimal-to-money bridge
//! - [`tariff`] - Slab schedules and the bill calculator
//! - [`lifecycle`] - Stage ledger and transition tables
//! - [`priority`] - Complaint priority overrides
//! - [`reference`] - Reference number format
//! - [`validation`] - Field and record validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: the current time is always a parameter
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: reported amounts are paise (i64), intermediates are exact decimals
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use portal_core::tariff::TariffBook;
//! use portal_core::{ServiceType, TariffCategory};
//! use rust_decimal::Decimal;
//!
//! let book = TariffBook::standard().unwrap();
//! let bill = book
//!     .compute(ServiceType::Electricity, TariffCategory::Residential, Decimal::new(350, 0), None)
//!     .unwrap();
//!
//! assert_eq!(bill.total_amount.to_string(), "₹2546.25");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod money;
pub mod priority;
pub mod reference;
pub mod tariff;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use lifecycle::{Ledger, LifecycleStatus};
pub use money::Money;
pub use priority::assign_priority;
pub use reference::{format_reference, parse_reference, ParsedReference, ReferenceKind};
pub use tariff::{compute_bill, BillComputation, FixedCharge, MeterReading, Slab, TariffBook, TariffSchedule};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of attempts the issuer makes before giving up on a
/// reference number.
pub const MAX_ISSUANCE_ATTEMPTS: u32 = 5;

/// Default page size for staff listings.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Upper bound for staff listings.
pub const MAX_LIST_LIMIT: i64 = 200;
