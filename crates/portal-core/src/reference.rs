//! # Reference Numbers
//!
//! Formatting and parsing of the human-readable numbers printed on
//! acknowledgements and bills. Issuing them (the sequence counter) is a
//! storage concern and lives in portal-db.
//!
//! ## Format
//! ```text
//!   NC  2025  000042
//!   ──  ────  ──────
//!   │    │      └── sequence, zero-padded to 6 digits (wider once it passes 999999)
//!   │    └───────── service year
//!   └────────────── prefix of the record kind
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::ApplicationType;

/// Minimum number of sequence digits.
pub const SEQUENCE_WIDTH: usize = 6;

/// The kind of record a reference number identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    NewConnection,
    ChangeOfName,
    Reconnection,
    LoadChange,
    CylinderBooking,
    Complaint,
    Bill,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 7] = [
        ReferenceKind::NewConnection,
        ReferenceKind::ChangeOfName,
        ReferenceKind::Reconnection,
        ReferenceKind::LoadChange,
        ReferenceKind::CylinderBooking,
        ReferenceKind::Complaint,
        ReferenceKind::Bill,
    ];

    /// The externally visible prefix. Never change these.
    pub const fn prefix(&self) -> &'static str {
        match self {
            ReferenceKind::NewConnection => "NC",
            ReferenceKind::ChangeOfName => "CN",
            ReferenceKind::Reconnection => "RC",
            ReferenceKind::LoadChange => "LC",
            ReferenceKind::CylinderBooking => "CB",
            ReferenceKind::Complaint => "CMP",
            ReferenceKind::Bill => "BL",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::NewConnection => "new_connection",
            ReferenceKind::ChangeOfName => "change_of_name",
            ReferenceKind::Reconnection => "reconnection",
            ReferenceKind::LoadChange => "load_change",
            ReferenceKind::CylinderBooking => "cylinder_booking",
            ReferenceKind::Complaint => "complaint",
            ReferenceKind::Bill => "bill",
        }
    }

    /// The application type behind this kind, `None` for complaints and bills.
    pub const fn application_type(&self) -> Option<ApplicationType> {
        match self {
            ReferenceKind::NewConnection => Some(ApplicationType::NewConnection),
            ReferenceKind::ChangeOfName => Some(ApplicationType::ChangeOfName),
            ReferenceKind::Reconnection => Some(ApplicationType::Reconnection),
            ReferenceKind::LoadChange => Some(ApplicationType::LoadChange),
            ReferenceKind::CylinderBooking => Some(ApplicationType::CylinderBooking),
            ReferenceKind::Complaint | ReferenceKind::Bill => None,
        }
    }
}

impl From<ApplicationType> for ReferenceKind {
    fn from(application_type: ApplicationType) -> Self {
        match application_type {
            ApplicationType::NewConnection => ReferenceKind::NewConnection,
            ApplicationType::ChangeOfName => ReferenceKind::ChangeOfName,
            ApplicationType::Reconnection => ReferenceKind::Reconnection,
            ApplicationType::LoadChange => ReferenceKind::LoadChange,
            ApplicationType::CylinderBooking => ReferenceKind::CylinderBooking,
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the reference number for a reserved sequence value.
///
/// ```rust
/// use portal_core::reference::{format_reference, ReferenceKind};
///
/// assert_eq!(format_reference(ReferenceKind::NewConnection, 2025, 1), "NC2025000001");
/// assert_eq!(format_reference(ReferenceKind::Complaint, 2025, 42), "CMP2025000042");
/// ```
pub fn format_reference(kind: ReferenceKind, service_year: i32, sequence: i64) -> String {
    format!(
        "{}{:04}{:0width$}",
        kind.prefix(),
        service_year,
        sequence,
        width = SEQUENCE_WIDTH
    )
}

/// A reference number split back into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedReference {
    pub kind: ReferenceKind,
    pub service_year: i32,
    pub sequence: i64,
}

/// Splits a reference number into kind, year and sequence.
///
/// Surrounding whitespace is ignored and the prefix is matched
/// case-insensitively, so `" nc2025000001 "` parses like `"NC2025000001"`.
pub fn parse_reference(reference: &str) -> CoreResult<ParsedReference> {
    let normalized = reference.trim().to_ascii_uppercase();
    let malformed = || CoreError::MalformedReference(reference.trim().to_string());

    let kind = ReferenceKind::ALL
        .into_iter()
        .find(|kind| normalized.starts_with(kind.prefix()))
        .ok_or_else(malformed)?;

    let digits = &normalized[kind.prefix().len()..];
    if digits.len() < 4 + SEQUENCE_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let (year, sequence) = digits.split_at(4);
    let service_year = year.parse::<i32>().map_err(|_| malformed())?;
    let sequence = sequence.parse::<i64>().map_err(|_| malformed())?;
    if sequence == 0 {
        return Err(malformed());
    }

    Ok(ParsedReference {
        kind,
        service_year,
        sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_are_distinct() {
        for kind in ReferenceKind::ALL {
            let others = ReferenceKind::ALL.iter().filter(|k| **k != kind);
            for other in others {
                assert!(
                    !kind.prefix().starts_with(other.prefix()),
                    "{} shadows {}",
                    other.prefix(),
                    kind.prefix()
                );
            }
        }
    }

    #[test]
    fn test_format() {
        assert_eq!(
            format_reference(ReferenceKind::CylinderBooking, 2024, 17),
            "CB2024000017"
        );
        assert_eq!(
            format_reference(ReferenceKind::Bill, 2025, 1_234_567),
            "BL20251234567"
        );
    }

    #[test]
    fn test_parse() {
        let parsed = parse_reference("CMP2025000042").unwrap();
        assert_eq!(parsed.kind, ReferenceKind::Complaint);
        assert_eq!(parsed.service_year, 2025);
        assert_eq!(parsed.sequence, 42);

        let parsed = parse_reference(" lc2026000003 ").unwrap();
        assert_eq!(parsed.kind, ReferenceKind::LoadChange);
        assert_eq!(parsed.kind.application_type(), Some(ApplicationType::LoadChange));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "NC", "XX2025000001", "NC2025", "NC20250000A1", "NC2025000000"] {
            assert!(
                matches!(parse_reference(bad), Err(CoreError::MalformedReference(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
