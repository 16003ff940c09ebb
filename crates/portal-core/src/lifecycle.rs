//! # Lifecycle Module
//!
//! The append-only stage ledger shared by applications and complaints.
//!
//! ## Application Machine
//! ```text
//!  submitted ─► document_verification ─► site_inspection ─► approval_pending
//!                                                                │
//!                                               ┌────────────────┴─────┐
//!                                               ▼                      ▼
//!                                           approved               rejected ■
//!                                               │
//!                                               ▼
//!                                        work_in_progress ─► completed ■
//! ```
//! Staff may skip or revisit stages: any live status can move to any other
//! status except `submitted` (only ever the first entry) and itself.
//!
//! ## Complaint Machine
//! ```text
//!  open ─► assigned ─► in_progress ─► resolved ─► closed ■
//!   ▲                                    │          │
//!   └──────────── (appendStage) ─────────┘          │
//!   └──────────── reopen() ─────────────────────────┘
//! ```
//! `■` marks terminal statuses. `closed` only leaves through [`Ledger::reopen`].
//!
//! ## Ledger Rules
//! - Never empty: [`Ledger::initialize`] writes the first entry.
//! - Append-only: entries are never edited or removed.
//! - Strictly increasing timestamps: a regressing clock is clamped to
//!   `previous + 1ms`.
//! - The record status is always the status of the last entry.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{ApplicationStatus, ComplaintStatus, StageEntry};
use crate::validation::{validate_remarks, validate_stage_name};

// =============================================================================
// Transition Tables
// =============================================================================

use ApplicationStatus as A;
use ComplaintStatus as C;

/// Allowed moves between application statuses.
pub const APPLICATION_TRANSITIONS: &[(ApplicationStatus, &[ApplicationStatus])] = &[
    (
        A::Submitted,
        &[
            A::DocumentVerification,
            A::SiteInspection,
            A::ApprovalPending,
            A::Approved,
            A::Rejected,
            A::WorkInProgress,
            A::Completed,
        ],
    ),
    (
        A::DocumentVerification,
        &[
            A::SiteInspection,
            A::ApprovalPending,
            A::Approved,
            A::Rejected,
            A::WorkInProgress,
            A::Completed,
        ],
    ),
    (
        A::SiteInspection,
        &[
            A::DocumentVerification,
            A::ApprovalPending,
            A::Approved,
            A::Rejected,
            A::WorkInProgress,
            A::Completed,
        ],
    ),
    (
        A::ApprovalPending,
        &[
            A::DocumentVerification,
            A::SiteInspection,
            A::Approved,
            A::Rejected,
            A::WorkInProgress,
            A::Completed,
        ],
    ),
    (
        A::Approved,
        &[
            A::DocumentVerification,
            A::SiteInspection,
            A::ApprovalPending,
            A::Rejected,
            A::WorkInProgress,
            A::Completed,
        ],
    ),
    (
        A::WorkInProgress,
        &[
            A::DocumentVerification,
            A::SiteInspection,
            A::ApprovalPending,
            A::Approved,
            A::Rejected,
            A::Completed,
        ],
    ),
    (A::Rejected, &[]),
    (A::Completed, &[]),
];

/// Allowed moves between complaint statuses through a normal stage append.
pub const COMPLAINT_TRANSITIONS: &[(ComplaintStatus, &[ComplaintStatus])] = &[
    (C::Open, &[C::Assigned, C::InProgress, C::Resolved, C::Closed]),
    (C::Assigned, &[C::InProgress, C::Resolved, C::Closed]),
    (C::InProgress, &[C::Assigned, C::Resolved, C::Closed]),
    (C::Resolved, &[C::Open, C::Assigned, C::InProgress, C::Closed]),
    (C::Closed, &[]),
];

// =============================================================================
// Lifecycle Status
// =============================================================================

/// A status that can be recorded in a [`Ledger`].
pub trait LifecycleStatus: Copy + Eq + fmt::Display + 'static {
    /// The adjacency table for this machine.
    const TRANSITIONS: &'static [(Self, &'static [Self])];

    /// Status of the first ledger entry.
    const INITIAL: Self;

    /// Stage name of the first ledger entry.
    const INITIAL_STAGE: &'static str;

    /// Label used when staff record a stage without naming it.
    fn stage_label(&self) -> &'static str;

    fn allowed_targets(&self) -> &'static [Self] {
        Self::TRANSITIONS
            .iter()
            .find(|(from, _)| from == self)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }

    fn can_transition_to(&self, to: Self) -> bool {
        self.allowed_targets().contains(&to)
    }
}

impl LifecycleStatus for ApplicationStatus {
    const TRANSITIONS: &'static [(Self, &'static [Self])] = APPLICATION_TRANSITIONS;
    const INITIAL: Self = ApplicationStatus::Submitted;
    const INITIAL_STAGE: &'static str = "Application Submitted";

    fn stage_label(&self) -> &'static str {
        match self {
            A::Submitted => "Application Submitted",
            A::DocumentVerification => "Document Verification",
            A::SiteInspection => "Site Inspection",
            A::ApprovalPending => "Approval Pending",
            A::Approved => "Approved",
            A::Rejected => "Rejected",
            A::WorkInProgress => "Work In Progress",
            A::Completed => "Completed",
        }
    }
}

impl LifecycleStatus for ComplaintStatus {
    const TRANSITIONS: &'static [(Self, &'static [Self])] = COMPLAINT_TRANSITIONS;
    const INITIAL: Self = ComplaintStatus::Open;
    const INITIAL_STAGE: &'static str = "Complaint Registered";

    fn stage_label(&self) -> &'static str {
        match self {
            C::Open => "Complaint Registered",
            C::Assigned => "Assigned",
            C::InProgress => "In Progress",
            C::Resolved => "Resolved",
            C::Closed => "Closed",
        }
    }
}

/// Stage name written by [`Ledger::reopen`].
pub const REOPENED_STAGE: &str = "Reopened";

// =============================================================================
// Ledger
// =============================================================================

/// Ordered stage history of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger<S> {
    entries: Vec<StageEntry<S>>,
}

impl<S: LifecycleStatus> Ledger<S> {
    /// Starts a ledger with its initial entry.
    pub fn initialize(
        status: S,
        stage_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        validate_stage_name(stage_name)?;
        Ok(Ledger {
            entries: vec![StageEntry {
                stage_name: stage_name.trim().to_string(),
                status,
                timestamp: now,
                remarks: None,
            }],
        })
    }

    /// Rebuilds a ledger from stored entries, oldest first.
    pub fn from_entries(entries: Vec<StageEntry<S>>) -> CoreResult<Self> {
        if entries.is_empty() {
            return Err(ValidationError::Required {
                field: "stage_history".to_string(),
            }
            .into());
        }
        Ok(Ledger { entries })
    }

    pub fn current_status(&self) -> S {
        self.last().status
    }

    pub fn entries(&self) -> &[StageEntry<S>] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<StageEntry<S>> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> &StageEntry<S> {
        // Constructors never produce an empty ledger.
        &self.entries[self.entries.len() - 1]
    }

    /// Records a move to `new_status`.
    ///
    /// `stage_name` falls back to the status label when `None`.
    ///
    /// ## Errors
    /// - current status is terminal → `TerminalState`
    /// - move not in the adjacency table → `InvalidTransition`
    /// - empty stage name or overlong remarks → `Validation`
    pub fn append(
        &mut self,
        stage_name: Option<&str>,
        new_status: S,
        remarks: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<StageEntry<S>> {
        let current = self.current_status();
        if current.is_terminal() {
            return Err(CoreError::TerminalState {
                status: current.to_string(),
            });
        }
        if !current.can_transition_to(new_status) {
            return Err(CoreError::InvalidTransition {
                from: current.to_string(),
                to: new_status.to_string(),
            });
        }

        let stage_name = stage_name.unwrap_or_else(|| new_status.stage_label());
        Ok(self.push(stage_name, new_status, remarks, now)?)
    }

    fn push(
        &mut self,
        stage_name: &str,
        status: S,
        remarks: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StageEntry<S>, ValidationError> {
        validate_stage_name(stage_name)?;
        let remarks = remarks.map(str::trim).filter(|r| !r.is_empty());
        if let Some(remarks) = remarks {
            validate_remarks(remarks)?;
        }

        let previous = self.last().timestamp;
        let timestamp = if now <= previous {
            previous + Duration::milliseconds(1)
        } else {
            now
        };

        let entry = StageEntry {
            stage_name: stage_name.trim().to_string(),
            status,
            timestamp,
            remarks: remarks.map(str::to_string),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }
}

impl Ledger<ComplaintStatus> {
    /// Reopens a closed complaint, appending a `Reopened` stage with status `open`.
    pub fn reopen(
        &mut self,
        remarks: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<StageEntry<ComplaintStatus>> {
        let current = self.current_status();
        if current != ComplaintStatus::Closed {
            return Err(CoreError::InvalidTransition {
                from: current.to_string(),
                to: ComplaintStatus::Open.to_string(),
            });
        }
        Ok(self.push(REOPENED_STAGE, ComplaintStatus::Open, remarks, now)?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
