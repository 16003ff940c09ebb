//! # portal-db: Database Layer for the Utility Portal
//!
//! SQLite storage for applications, complaints, stage histories, reference
//! counters, tariffs and bills, through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Utility Portal Data Flow                           │
//! │                                                                         │
//! │  HTTP handler (POST /api/v1/applications)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                    portal-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐   │    │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │   │    │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │   │    │
//! │  │   │               │    │ Applications   │    │              │   │    │
//! │  │   │ SqlitePool    │◄───│ Complaints     │    │ 001_initial  │   │    │
//! │  │   │ WAL, FKs on   │    │ Tariffs, Bills │    │  _schema.sql │   │    │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘   │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     SQLite Database (portal.db)                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use portal_db::{Database, DbConfig, NewComplaint};
//!
//! let db = Database::new(DbConfig::new("portal.db")).await?;
//! let complaint = db.complaints().file(new_complaint, Utc::now()).await?;
//! let tracking = db.track(&complaint.reference_number).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::application::{
    ApplicationRepository, ApplicationSummary, NewApplication, StageUpdate,
};
pub use repository::bill::{BillRepository, NewBill};
pub use repository::complaint::{ComplaintRepository, NewComplaint};
pub use repository::sequence::SequenceRepository;
pub use repository::tariff::TariffRepository;
pub use repository::tracking::Tracking;
