//! # Application Routes
//!
//! Consumer submissions and the staff work queue.
//!
//! ## Submission Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/v1/applications                                              │
//! │  { serviceType, applicationType, payload, documents? }                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  payload decoded against applicationType ── mismatch ──► 400            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  applications().submit(...) ── issues NC/CN/RC/LC/CB number             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  201 { referenceNumber, status: "submitted", submittedAt }              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use portal_core::{
    ApplicationPayload, ApplicationStatus, ApplicationType, DocumentRef, ServiceType,
    DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
use portal_db::{ApplicationSummary, NewApplication};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{StageRequest, StageResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Submission body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationRequest {
    pub service_type: ServiceType,
    pub application_type: ApplicationType,
    /// Type-specific fields, decoded once `application_type` is known.
    pub payload: serde_json::Value,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}

impl SubmitApplicationRequest {
    fn into_new_application(self) -> Result<NewApplication, ApiError> {
        let tagged = json!({
            "applicationType": self.application_type,
            "payload": self.payload,
        });
        let payload: ApplicationPayload = serde_json::from_value(tagged).map_err(|e| {
            ApiError::validation(format!("Invalid {} payload: {}", self.application_type, e))
        })?;

        Ok(NewApplication {
            service_type: self.service_type,
            payload,
            documents: self.documents,
        })
    }
}

/// Acknowledgement of a submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationResponse {
    pub reference_number: String,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
}

/// `POST /api/v1/applications`
pub async fn submit(
    State(state): State<AppState>,
    body: Result<Json<SubmitApplicationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitApplicationResponse>), ApiError> {
    let Json(request) = body?;
    let application = state
        .db
        .applications()
        .submit(request.into_new_application()?, Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitApplicationResponse {
            reference_number: application.reference_number,
            status: application.status,
            submitted_at: application.submitted_at,
        }),
    ))
}

/// `POST /api/v1/applications/:reference/stages`
pub async fn append_stage(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    body: Result<Json<StageRequest<ApplicationStatus>>, JsonRejection>,
) -> Result<Json<StageResponse<ApplicationStatus>>, ApiError> {
    let Json(request) = body?;
    let application = state
        .db
        .applications()
        .append_stage(&reference, request.into(), Utc::now())
        .await?;

    Ok(Json(StageResponse {
        reference_number: application.reference_number,
        status: application.status,
        version: application.version,
        stage_history: application.stage_history,
    }))
}

/// Staff queue filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<ApplicationStatus>,
    pub limit: Option<i64>,
}

/// `GET /api/v1/applications?status=&limit=`
///
/// Oldest first. `limit` defaults to 50 and may not exceed 200.
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<ApplicationSummary>>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "limit must be between 1 and {}",
            MAX_LIST_LIMIT
        )));
    }

    let summaries = state.db.applications().list(query.status, limit).await?;
    debug!(count = summaries.len(), status = ?query.status, "Listed applications");
    Ok(Json(summaries))
}
