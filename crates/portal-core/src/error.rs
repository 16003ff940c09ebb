//! # Error Types
//!
//! Domain-specific error types for portal-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  portal-core errors (this file)                                        │
//! │  ├── CoreError        - Tariff, lifecycle and workflow rule failures   │
//! │  └── ValidationError  - Input validation failures (carry the field)    │
//! │                                                                         │
//! │  portal-db errors (separate crate)                                     │
//! │  └── DbError          - Storage, concurrency and issuance failures     │
//! │                                                                         │
//! │  portal-api errors (in app)                                            │
//! │  └── ApiError         - What HTTP clients see (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, status, category)
//! 3. Invalid transitions are surfaced, never coerced to a nearby status

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No tariff schedule exists for the requested category.
    ///
    /// ## When This Occurs
    /// - The category string does not name a known category
    /// - The category exists but not for this service (agricultural gas)
    /// - No schedule is registered for (service, category)
    #[error("Unknown tariff category: {category}")]
    UnknownCategory { category: String },

    /// A tariff schedule breaks the slab partition rules.
    #[error("Invalid tariff schedule: {reason}")]
    InvalidTariff { reason: String },

    /// The requested status is not reachable from the current one.
    ///
    /// ## User Workflow
    /// ```text
    /// Staff selects "submitted" for an application in site_inspection
    ///      │
    ///      ▼
    /// InvalidTransition { from: "site_inspection", to: "submitted" }
    ///      │
    ///      ▼
    /// Ledger untouched, caller sees 409
    /// ```
    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The record reached a terminal status and accepts no further stages.
    #[error("Record is {status}, no further stages can be recorded")]
    TerminalState { status: String },

    /// An application type or complaint category is not offered for the
    /// selected service (cylinder booking for electricity, for example).
    #[error("{item} is not available for {service} service")]
    ServiceMismatch { service: String, item: String },

    /// A computed amount does not fit in the money representation.
    #[error("Amount {amount} is out of range")]
    AmountOverflow { amount: String },

    /// A reference number could not be parsed.
    #[error("Malformed reference number: {0}")]
    MalformedReference(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant names the offending field so it can be surfaced to the
/// caller next to the form input that produced it.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (phone number, email, reference number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
