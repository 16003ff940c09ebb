//! # HTTP Routes
//!
//! Every endpoint the portal exposes.
//!
//! ## Route Organization
//! ```text
//! routes/
//! ├── mod.rs           ◄─── You are here (router)
//! ├── applications.rs  ◄─── Submit, stage, staff queue
//! ├── complaints.rs    ◄─── File, stage, reopen
//! ├── track.rs         ◄─── Public status lookup
//! ├── bills.rs         ◄─── Compute, persist, confirm payment
//! └── health.rs        ◄─── Liveness + database check
//! ```
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/v1/applications/NC2025000001/stages                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Json<StageRequest<ApplicationStatus>>  ◄── 400 on malformed body       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  state.db.applications().append_stage(reference, update, Utc::now())    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Json<StageResponse> or ApiError ──► status code from ErrorCode         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod applications;
pub mod bills;
pub mod complaints;
pub mod health;
pub mod track;

use axum::routing::{get, post};
use axum::Router;
use portal_core::StageEntry;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use portal_db::StageUpdate;

/// Builds the router with every portal endpoint.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/applications",
            post(applications::submit).get(applications::list),
        )
        .route(
            "/applications/:reference/stages",
            post(applications::append_stage),
        )
        .route("/complaints", post(complaints::file))
        .route(
            "/complaints/:reference/stages",
            post(complaints::append_stage),
        )
        .route("/complaints/:reference/reopen", post(complaints::reopen))
        .route("/track/:reference", get(track::track))
        .route("/bills", post(bills::create))
        .route("/bills/compute", post(bills::compute))
        .route("/bills/:bill_number/payment", post(bills::confirm_payment));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health::health))
        .with_state(state)
}

// =============================================================================
// Shared Stage DTOs
// =============================================================================

/// Body of a staff stage action, for applications and complaints alike.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRequest<S> {
    pub new_status: S,
    #[serde(default)]
    pub stage_name: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

impl<S> From<StageRequest<S>> for StageUpdate<S> {
    fn from(request: StageRequest<S>) -> Self {
        StageUpdate {
            new_status: Some(request.new_status),
            stage_name: request.stage_name,
            remarks: request.remarks,
            expected_version: request.expected_version,
        }
    }
}

/// Record state after a stage action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResponse<S> {
    pub reference_number: String,
    pub status: S,
    pub version: i64,
    pub stage_history: Vec<StageEntry<S>>,
}
