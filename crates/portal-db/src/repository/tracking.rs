//! # Public Tracking
//!
//! Read-only status lookup by reference number, shared by applications and
//! complaints. The prefix of the reference decides which table is read.
//!
//! ```text
//!  "nc2025000001" ──► parse_reference ──► NewConnection ──► applications
//!  "CMP2025000007" ─► parse_reference ──► Complaint ─────► complaints
//!  "BL2025000003" ──► parse_reference ──► Bill ──────────► NotFound
//! ```

use portal_core::reference::{format_reference, parse_reference, ReferenceKind};
use portal_core::{Application, Complaint, StageEntry};
use serde::Serialize;
use std::fmt::Display;

use super::application::ApplicationRepository;
use super::complaint::ComplaintRepository;
use crate::error::{DbError, DbResult};

/// What the tracking page shows for a reference number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracking {
    pub reference_number: String,
    pub kind: ReferenceKind,
    pub status: String,
    pub stage_history: Vec<StageEntry<String>>,
}

fn erase<S: Display>(history: Vec<StageEntry<S>>) -> Vec<StageEntry<String>> {
    history
        .into_iter()
        .map(|entry| StageEntry {
            stage_name: entry.stage_name,
            status: entry.status.to_string(),
            timestamp: entry.timestamp,
            remarks: entry.remarks,
        })
        .collect()
}

impl From<Application> for Tracking {
    fn from(application: Application) -> Self {
        Tracking {
            kind: application.application_type().into(),
            reference_number: application.reference_number,
            status: application.status.to_string(),
            stage_history: erase(application.stage_history),
        }
    }
}

impl From<Complaint> for Tracking {
    fn from(complaint: Complaint) -> Self {
        Tracking {
            reference_number: complaint.reference_number,
            kind: ReferenceKind::Complaint,
            status: complaint.status.to_string(),
            stage_history: erase(complaint.stage_history),
        }
    }
}

/// Looks a reference number up in whichever store its prefix names.
pub(crate) async fn track(
    applications: &ApplicationRepository,
    complaints: &ComplaintRepository,
    reference_number: &str,
) -> DbResult<Tracking> {
    let parsed = parse_reference(reference_number)?;
    let normalized = format_reference(parsed.kind, parsed.service_year, parsed.sequence);

    match parsed.kind {
        ReferenceKind::Complaint => Ok(complaints.get(&normalized).await?.into()),
        ReferenceKind::Bill => Err(DbError::not_found("Tracked record", normalized)),
        _ => Ok(applications.get(&normalized).await?.into()),
    }
}
