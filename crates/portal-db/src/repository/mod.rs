//! # Repository Module
//!
//! Database repositories for the utility portal.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler                                                           │
//! │       │                                                                 │
//! │       │  db.applications().append_stage(reference, update, now)         │
//! │       ▼                                                                 │
//! │  ApplicationRepository                                                  │
//! │  ├── submit      ──► sequence::issue  ──► applications + stage_entries  │
//! │  ├── get / find                                                         │
//! │  ├── append_stage ─► stage::commit_stage (optimistic version check)     │
//! │  └── list                                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ApplicationRepository`](application::ApplicationRepository) - Consumer applications
//! - [`ComplaintRepository`](complaint::ComplaintRepository) - Complaints and reopening
//! - [`TariffRepository`](tariff::TariffRepository) - Tariff schedules by effective year
//! - [`BillRepository`](bill::BillRepository) - Persisted bills and payment
//! - [`SequenceRepository`](sequence::SequenceRepository) - Reference counters (read-only)

pub mod application;
pub mod bill;
pub mod complaint;
pub mod sequence;
pub mod tariff;
pub mod tracking;

mod stage;
