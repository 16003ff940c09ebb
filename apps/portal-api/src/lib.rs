//! # portal-api: HTTP API for the Utility Portal
//!
//! Thin orchestration over `portal-db`: handlers parse requests, read the
//! clock, call a repository and map errors to status codes.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Portal API Server                               │
//! │                                                                         │
//! │  Portal / staff UI ──► HTTP (8080) ──► routes ──► portal-db ──► SQLite  │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                                     portal-core                         │
//! │                             (tariffs, ledger, validation)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::{ConfigError, PortalConfig};
pub use error::{ApiError, ErrorCode};
pub use routes::router;
pub use state::AppState;
