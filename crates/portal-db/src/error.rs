//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (rule violations)          │
//! │       │                                 │                               │
//! │       └────────────┬────────────────────┘                               │
//! │                    ▼                                                    │
//! │  DbError (this module) ← Adds context and categorization                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (portal-api) ← Serialized with an HTTP status                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use portal_core::CoreError;
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Unknown reference or bill number
    /// - No tariff rows for the requested year
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Two writers raced on the same stage sequence
    /// - A reference number collided (retried by the issuer first)
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),

    /// The record changed between read and write.
    ///
    /// ## User Workflow
    /// ```text
    /// Officer A reads NC2025000001 (version 3)
    /// Officer B reads NC2025000001 (version 3)
    /// Officer B appends "site_inspection"   → version 4
    /// Officer A appends "approved"          → ConcurrentModification
    ///      │
    ///      ▼
    /// A re-reads, sees B's stage, decides again
    /// ```
    #[error("{reference_number} was modified concurrently (expected version {expected_version})")]
    ConcurrentModification {
        reference_number: String,
        expected_version: i64,
    },

    /// The issuer could not find a free reference number.
    #[error("Could not issue a {prefix} reference for {year} after {attempts} attempts")]
    IssuanceFailed {
        prefix: String,
        year: i32,
        attempts: u32,
    },

    /// A bill was already settled with a different payment.
    #[error("Bill {bill_number} is already paid with {payment_reference}")]
    AlreadyPaid {
        bill_number: String,
        payment_reference: String,
    },

    /// A business rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Wraps a failure to begin or commit a transaction.
    pub fn transaction(err: sqlx::Error) -> Self {
        DbError::TransactionFailed(err.to_string())
    }

    /// Marks a row that could not be decoded into a domain value.
    pub fn corrupt(what: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        DbError::Internal(format!("corrupt {}: {}", what.into(), detail))
    }

    /// True when a unique index on a `reference_number` or `bill_number`
    /// column rejected the insert.
    pub fn is_reference_collision(&self) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { field, .. }
                if field.ends_with(".reference_number") || field.ends_with(".bill_number")
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>[, <table>.<column>]"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown");
                    DbError::duplicate(field, "unknown")
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<portal_core::ValidationError> for DbError {
    fn from(err: portal_core::ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_collision_detection() {
        assert!(DbError::duplicate("applications.reference_number", "NC2025000001")
            .is_reference_collision());
        assert!(DbError::duplicate("bills.bill_number", "BL2025000001").is_reference_collision());
        assert!(!DbError::duplicate(
            "stage_entries.reference_number, stage_entries.seq",
            "x"
        )
        .is_reference_collision());
    }

    #[test]
    fn test_core_errors_pass_through() {
        let err: DbError = CoreError::TerminalState {
            status: "closed".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Record is closed, no further stages can be recorded");
    }
}
