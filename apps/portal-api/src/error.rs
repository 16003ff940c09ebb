//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Portal API                         │
//! │                                                                         │
//! │  Handler: Result<Json<T>, ApiError>                                     │
//! │         │                                                               │
//! │         ├── DbError::NotFound ─────────────────────────► 404 NOT_FOUND  │
//! │         ├── CoreError::Validation / ServiceMismatch ───► 400            │
//! │         ├── CoreError::InvalidTransition / TerminalState ► 409          │
//! │         ├── DbError::ConcurrentModification ───────────► 409            │
//! │         ├── DbError::AlreadyPaid ──────────────────────► 409            │
//! │         └── storage failures (logged) ─────────────────► 500            │
//! │                                                                         │
//! │  Body: { "code": "INVALID_TRANSITION", "message": "Cannot move ..." }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use portal_core::{CoreError, ValidationError};
use portal_db::DbError;
use serde::Serialize;
use tracing::error;

/// Error body returned by every failing endpoint.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Application not found: NC2025000042"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Requested status not reachable from the current one (409)
    InvalidTransition,

    /// Record is closed for further stages (409)
    TerminalState,

    /// Record changed since the caller read it (409)
    ConcurrentModification,

    /// Bill already paid under another reference (409)
    AlreadyPaid,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidTransition
            | ErrorCode::TerminalState
            | ErrorCode::ConcurrentModification
            | ErrorCode::AlreadyPaid => StatusCode::CONFLICT,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ConcurrentModification { .. } => {
                ApiError::new(ErrorCode::ConcurrentModification, err.to_string())
            }
            DbError::AlreadyPaid { .. } => ApiError::new(ErrorCode::AlreadyPaid, err.to_string()),
            DbError::Core(core) => core.into(),
            DbError::IssuanceFailed { .. } => {
                error!(error = %err, "Reference issuance exhausted its retries");
                ApiError::new(ErrorCode::DatabaseError, "Could not issue a reference number")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
            CoreError::UnknownCategory { .. }
            | CoreError::ServiceMismatch { .. }
            | CoreError::MalformedReference(_)
            | CoreError::AmountOverflow { .. } => ApiError::validation(message),
            CoreError::InvalidTransition { .. } => {
                ApiError::new(ErrorCode::InvalidTransition, message)
            }
            CoreError::TerminalState { .. } => ApiError::new(ErrorCode::TerminalState, message),
            CoreError::InvalidTariff { .. } => {
                error!(error = %message, "Stored tariff schedule is invalid");
                ApiError::internal("Tariff configuration is invalid")
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                DbError::not_found("Application", "NC2025000009").into(),
                StatusCode::NOT_FOUND,
            ),
            (
                CoreError::Validation(ValidationError::Required {
                    field: "description".to_string(),
                })
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                CoreError::MalformedReference("ZZ1".to_string()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                DbError::Core(CoreError::InvalidTransition {
                    from: "closed".to_string(),
                    to: "open".to_string(),
                })
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                CoreError::TerminalState {
                    status: "completed".to_string(),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                DbError::ConcurrentModification {
                    reference_number: "NC2025000001".to_string(),
                    expected_version: 3,
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                DbError::AlreadyPaid {
                    bill_number: "BL2025000001".to_string(),
                    payment_reference: "UPI-1".to_string(),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                DbError::QueryFailed("disk I/O error".to_string()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.code.status(), status, "{}", error);
        }
    }

    #[test]
    fn test_storage_details_are_not_leaked() {
        let error: ApiError = DbError::QueryFailed("no such table: bills".to_string()).into();
        assert_eq!(error.code, ErrorCode::DatabaseError);
        assert!(!error.message.contains("bills"));
    }

    #[test]
    fn test_serialized_shape() {
        let error = ApiError::not_found("Bill", "BL2025000001");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Bill not found: BL2025000001");
    }
}
