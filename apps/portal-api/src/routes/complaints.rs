//! # Complaint Routes
//!
//! Filing, staff stage actions and reopening.
//!
//! Priority in the response is the assigned one: safety categories such as
//! `gas_leak` override whatever the consumer asked for.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use portal_core::{
    Complaint, ComplaintCategory, ComplaintStatus, ContactDetails, Priority, ServiceType,
};
use portal_db::NewComplaint;
use serde::{Deserialize, Serialize};

use super::{StageRequest, StageResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Complaint body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileComplaintRequest {
    pub service_type: ServiceType,
    pub category: ComplaintCategory,
    #[serde(default)]
    pub requested_priority: Option<Priority>,
    pub description: String,
    pub contact: ContactDetails,
}

/// Acknowledgement of a filed complaint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileComplaintResponse {
    pub reference_number: String,
    pub status: ComplaintStatus,
    pub priority: Priority,
}

/// Reopen body. Every field is optional; `{}` is a valid request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReopenRequest {
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

fn stage_response(complaint: Complaint) -> StageResponse<ComplaintStatus> {
    StageResponse {
        reference_number: complaint.reference_number,
        status: complaint.status,
        version: complaint.version,
        stage_history: complaint.stage_history,
    }
}

/// `POST /api/v1/complaints`
pub async fn file(
    State(state): State<AppState>,
    body: Result<Json<FileComplaintRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FileComplaintResponse>), ApiError> {
    let Json(request) = body?;
    let complaint = state
        .db
        .complaints()
        .file(
            NewComplaint {
                service_type: request.service_type,
                category: request.category,
                requested_priority: request.requested_priority,
                description: request.description,
                contact: request.contact,
            },
            Utc::now(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(FileComplaintResponse {
            reference_number: complaint.reference_number,
            status: complaint.status,
            priority: complaint.priority,
        }),
    ))
}

/// `POST /api/v1/complaints/:reference/stages`
pub async fn append_stage(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    body: Result<Json<StageRequest<ComplaintStatus>>, JsonRejection>,
) -> Result<Json<StageResponse<ComplaintStatus>>, ApiError> {
    let Json(request) = body?;
    let complaint = state
        .db
        .complaints()
        .append_stage(&reference, request.into(), Utc::now())
        .await?;

    Ok(Json(stage_response(complaint)))
}

/// `POST /api/v1/complaints/:reference/reopen`
///
/// Only a `closed` complaint can be reopened; it goes back to `open`.
pub async fn reopen(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    body: Result<Json<ReopenRequest>, JsonRejection>,
) -> Result<Json<StageResponse<ComplaintStatus>>, ApiError> {
    let Json(request) = body?;
    let complaint = state
        .db
        .complaints()
        .reopen(
            &reference,
            request.remarks.as_deref(),
            request.expected_version,
            Utc::now(),
        )
        .await?;

    Ok(Json(stage_response(complaint)))
}
