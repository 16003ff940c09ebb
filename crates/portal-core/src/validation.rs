//! # Validation Module
//!
//! Input validation for portal submissions.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (portal-api)                                             │
//! │  ├── Shape checks (deserialization, enum strings)                       │
//! │  └── Unknown fields / wrong types → 400                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Field rules (names, phones, lengths, ranges)                       │
//! │  └── Cross-field rules (service vs application type)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL / CHECK constraints                                       │
//! │  └── UNIQUE reference numbers and stage sequence                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use portal_core::validation::{validate_phone, validate_description};
//!
//! assert!(validate_phone("+91 98765 43210").is_ok());
//! assert!(validate_description("Too short").is_err());
//! ```

use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{
    ApplicantDetails, ApplicationPayload, ComplaintCategory, ContactDetails, DocumentRef,
    PremisesAddress, ServiceType,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MIN_LEN: usize = 10;
pub const DESCRIPTION_MAX_LEN: usize = 2000;
pub const REMARKS_MAX_LEN: usize = 500;
pub const STAGE_NAME_MAX_LEN: usize = 100;
pub const ADDRESS_MAX_LEN: usize = 300;
pub const MAX_DOCUMENT_BYTES: i64 = 5 * 1024 * 1024;
pub const MAX_DOCUMENTS: usize = 10;
pub const ALLOWED_DOCUMENT_TYPES: [&str; 3] = ["application/pdf", "image/jpeg", "image/png"];
pub const MAX_LOAD_KW: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
pub const MAX_CYLINDERS: u8 = 2;
pub const MIN_SERVICE_YEAR: i32 = 2000;
pub const MAX_SERVICE_YEAR: i32 = 9999;

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

fn invalid_format(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a person's name.
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
/// - Letters, spaces, dots, hyphens and apostrophes only
///
/// ## Example
/// ```rust
/// use portal_core::validation::validate_person_name;
///
/// assert!(validate_person_name("full_name", "K. R. D'Souza").is_ok());
/// assert!(validate_person_name("full_name", "R2-D2").is_err());
/// ```
pub fn validate_person_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(required(field));
    }

    if char_len(name) > NAME_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: NAME_MAX_LEN,
        });
    }

    if !name
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '.' || c == '-' || c == '\'')
    {
        return Err(invalid_format(
            field,
            "must contain only letters, spaces, dots, hyphens and apostrophes",
        ));
    }

    Ok(())
}

/// Validates a mobile number and returns its 10 significant digits.
///
/// ## Rules
/// - Spaces and hyphens are ignored
/// - Optional `+91` (or `91`) country prefix
/// - Exactly 10 digits, the first one 6-9
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let compact: String = phone
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();

    if compact.is_empty() {
        return Err(required("phone"));
    }

    let digits = compact
        .strip_prefix("+91")
        .or_else(|| (compact.len() == 12).then(|| compact.strip_prefix("91")).flatten())
        .unwrap_or(compact.as_str());

    if digits.len() != 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid_format("phone", "must be 10 digits, optionally prefixed by +91"));
    }
    if !matches!(digits.as_bytes()[0], b'6'..=b'9') {
        return Err(invalid_format("phone", "must start with 6, 7, 8 or 9"));
    }

    Ok(digits.to_string())
}

/// Validates the shape of an email address (`local@domain.tld`).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(required("email"));
    }
    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let shape_ok = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain
                    .rsplit_once('.')
                    .map_or(false, |(host, tld)| !host.is_empty() && tld.len() >= 2)
        }
        None => false,
    };

    if !shape_ok {
        return Err(invalid_format("email", "must look like name@example.com"));
    }

    Ok(())
}

/// Validates a consumer (account) number.
///
/// ## Rules
/// - 6 to 20 characters
/// - Uppercase letters, digits and hyphens
pub fn validate_consumer_number(consumer_number: &str) -> ValidationResult<()> {
    let value = consumer_number.trim();

    if value.is_empty() {
        return Err(required("consumer_number"));
    }
    if value.len() < 6 {
        return Err(ValidationError::TooShort {
            field: "consumer_number".to_string(),
            min: 6,
        });
    }
    if value.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "consumer_number".to_string(),
            max: 20,
        });
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid_format(
            "consumer_number",
            "must contain only uppercase letters, digits and hyphens",
        ));
    }

    Ok(())
}

/// Validates a complaint description (10 to 2000 characters after trimming).
pub fn validate_description(description: &str) -> ValidationResult<()> {
    let description = description.trim();

    if description.is_empty() {
        return Err(required("description"));
    }

    let len = char_len(description);
    if len < DESCRIPTION_MIN_LEN {
        return Err(ValidationError::TooShort {
            field: "description".to_string(),
            min: DESCRIPTION_MIN_LEN,
        });
    }
    if len > DESCRIPTION_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: DESCRIPTION_MAX_LEN,
        });
    }

    Ok(())
}

/// Validates staff remarks on a stage entry.
pub fn validate_remarks(remarks: &str) -> ValidationResult<()> {
    if char_len(remarks.trim()) > REMARKS_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: "remarks".to_string(),
            max: REMARKS_MAX_LEN,
        });
    }
    Ok(())
}

pub fn validate_stage_name(stage_name: &str) -> ValidationResult<()> {
    let stage_name = stage_name.trim();
    if stage_name.is_empty() {
        return Err(required("stage_name"));
    }
    if char_len(stage_name) > STAGE_NAME_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: "stage_name".to_string(),
            max: STAGE_NAME_MAX_LEN,
        });
    }
    Ok(())
}

fn validate_address_line(field: &str, line: &str) -> ValidationResult<()> {
    let line = line.trim();
    if line.is_empty() {
        return Err(required(field));
    }
    if char_len(line) > ADDRESS_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: ADDRESS_MAX_LEN,
        });
    }
    Ok(())
}

/// Validates a 6-digit PIN code.
pub fn validate_pin_code(pin_code: &str) -> ValidationResult<()> {
    let pin_code = pin_code.trim();
    if pin_code.is_empty() {
        return Err(required("pin_code"));
    }
    if pin_code.len() != 6
        || !pin_code.bytes().all(|b| b.is_ascii_digit())
        || pin_code.starts_with('0')
    {
        return Err(invalid_format("pin_code", "must be 6 digits, not starting with 0"));
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a load in kW: `0 < kW <= 1000`.
pub fn validate_load_kw(field: &str, load_kw: Decimal) -> ValidationResult<()> {
    if load_kw <= Decimal::ZERO || load_kw > MAX_LOAD_KW {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0 (exclusive)".to_string(),
            max: MAX_LOAD_KW.to_string(),
        });
    }
    Ok(())
}

/// Validates a cylinder booking quantity (1 or 2).
pub fn validate_cylinder_count(count: u8) -> ValidationResult<()> {
    if count == 0 || count > MAX_CYLINDERS {
        return Err(ValidationError::OutOfRange {
            field: "cylinder_count".to_string(),
            min: "1".to_string(),
            max: MAX_CYLINDERS.to_string(),
        });
    }
    Ok(())
}

/// Validates a consumption figure supplied directly.
pub fn validate_units(units: Decimal) -> ValidationResult<()> {
    if units < Decimal::ZERO {
        return Err(ValidationError::Negative {
            field: "units_consumed".to_string(),
        });
    }
    Ok(())
}

pub fn validate_service_year(year: i32) -> ValidationResult<()> {
    if !(MIN_SERVICE_YEAR..=MAX_SERVICE_YEAR).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: "service_year".to_string(),
            min: MIN_SERVICE_YEAR.to_string(),
            max: MAX_SERVICE_YEAR.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Document Validators
// =============================================================================

/// Validates uploaded document metadata.
///
/// ## Rules
/// - Non-empty name and storage reference
/// - PDF, JPEG or PNG
/// - 1 byte to 5 MiB
pub fn validate_document(document: &DocumentRef) -> ValidationResult<()> {
    if document.name.trim().is_empty() {
        return Err(required("documents.name"));
    }
    if char_len(document.name.trim()) > 255 {
        return Err(ValidationError::TooLong {
            field: "documents.name".to_string(),
            max: 255,
        });
    }
    if document.storage_ref.trim().is_empty() {
        return Err(required("documents.storage_ref"));
    }
    if !ALLOWED_DOCUMENT_TYPES.contains(&document.mime_type.as_str()) {
        return Err(ValidationError::NotAllowed {
            field: "documents.mime_type".to_string(),
            allowed: ALLOWED_DOCUMENT_TYPES.iter().map(|t| t.to_string()).collect(),
        });
    }
    if document.size_bytes < 1 || document.size_bytes > MAX_DOCUMENT_BYTES {
        return Err(ValidationError::OutOfRange {
            field: "documents.size_bytes".to_string(),
            min: "1".to_string(),
            max: MAX_DOCUMENT_BYTES.to_string(),
        });
    }
    Ok(())
}

pub fn validate_documents(documents: &[DocumentRef]) -> ValidationResult<()> {
    if documents.len() > MAX_DOCUMENTS {
        return Err(ValidationError::OutOfRange {
            field: "documents".to_string(),
            min: "0".to_string(),
            max: MAX_DOCUMENTS.to_string(),
        });
    }
    documents.iter().try_for_each(validate_document)
}

// =============================================================================
// Record Validators
// =============================================================================

fn validate_applicant(applicant: &ApplicantDetails) -> ValidationResult<()> {
    validate_person_name("full_name", &applicant.full_name)?;
    validate_phone(&applicant.phone)?;
    if let Some(email) = applicant.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    Ok(())
}

fn validate_premises(premises: &PremisesAddress) -> ValidationResult<()> {
    validate_address_line("line1", &premises.line1)?;
    validate_address_line("city", &premises.city)?;
    validate_pin_code(&premises.pin_code)
}

/// Validates an application payload against the selected service.
///
/// ## Errors
/// - application type not offered for the service → `ServiceMismatch`
/// - tariff category not offered for the service → `UnknownCategory`
/// - any field rule → `Validation`
pub fn validate_application(service: ServiceType, payload: &ApplicationPayload) -> CoreResult<()> {
    let application_type = payload.application_type();
    if !application_type.is_offered_for(service) {
        return Err(CoreError::ServiceMismatch {
            service: service.to_string(),
            item: application_type.to_string(),
        });
    }

    validate_applicant(payload.applicant())?;

    match payload {
        ApplicationPayload::NewConnection {
            premises,
            category,
            requested_load_kw,
            ..
        } => {
            if !category.is_offered_for(service) {
                return Err(CoreError::UnknownCategory {
                    category: format!("{}/{}", service, category),
                });
            }
            validate_premises(premises)?;
            match (service, requested_load_kw) {
                (ServiceType::Electricity, None) => return Err(required("requested_load_kw").into()),
                (_, Some(load)) => validate_load_kw("requested_load_kw", *load)?,
                (_, None) => {}
            }
        }
        ApplicationPayload::ChangeOfName {
            consumer_number,
            current_name,
            ..
        } => {
            validate_consumer_number(consumer_number)?;
            validate_person_name("current_name", current_name)?;
        }
        ApplicationPayload::Reconnection {
            consumer_number, ..
        } => {
            validate_consumer_number(consumer_number)?;
        }
        ApplicationPayload::LoadChange {
            consumer_number,
            current_load_kw,
            requested_load_kw,
            ..
        } => {
            validate_consumer_number(consumer_number)?;
            validate_load_kw("current_load_kw", *current_load_kw)?;
            validate_load_kw("requested_load_kw", *requested_load_kw)?;
            if current_load_kw == requested_load_kw {
                return Err(invalid_format(
                    "requested_load_kw",
                    "must differ from the current load",
                )
                .into());
            }
        }
        ApplicationPayload::CylinderBooking {
            consumer_number,
            cylinder_count,
            delivery_address,
            ..
        } => {
            validate_consumer_number(consumer_number)?;
            validate_cylinder_count(*cylinder_count)?;
            validate_premises(delivery_address)?;
        }
    }

    Ok(())
}

/// Validates a complaint before it is filed.
pub fn validate_complaint(
    service: ServiceType,
    category: ComplaintCategory,
    description: &str,
    contact: &ContactDetails,
) -> CoreResult<()> {
    if !category.is_offered_for(service) {
        return Err(CoreError::ServiceMismatch {
            service: service.to_string(),
            item: category.to_string(),
        });
    }

    validate_description(description)?;
    validate_person_name("name", &contact.name)?;
    validate_phone(&contact.phone)?;
    if let Some(email) = contact.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    validate_address_line("address", &contact.address)?;
    if let Some(consumer_number) = contact.consumer_number.as_deref() {
        validate_consumer_number(consumer_number)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NameChangeReason, TariffCategory};
    use rust_decimal_macros::dec;

    fn applicant() -> ApplicantDetails {
        ApplicantDetails {
            full_name: "Asha Rao".to_string(),
            phone: "9876543210".to_string(),
            email: Some("asha@example.com".to_string()),
        }
    }

    fn premises() -> PremisesAddress {
        PremisesAddress {
            line1: "12 MG Road".to_string(),
            line2: None,
            city: "Bengaluru".to_string(),
            pin_code: "560001".to_string(),
        }
    }

    #[test]
    fn test_validate_person_name() {
        assert!(validate_person_name("name", "Asha Rao").is_ok());
        assert!(validate_person_name("name", "Zoë O'Brien-Smith").is_ok());
        assert!(matches!(
            validate_person_name("name", "   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_person_name("name", &"a".repeat(101)).is_err());
        assert!(validate_person_name("name", "Asha123").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone("9876543210").unwrap(), "9876543210");
        assert_eq!(validate_phone("+91 98765-43210").unwrap(), "9876543210");
        assert_eq!(validate_phone("919876543210").unwrap(), "9876543210");
        assert!(validate_phone("").is_err());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("5876543210").is_err());
        assert!(validate_phone("+1 9876543210").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("asha@example.com").is_ok());
        assert!(validate_email("a.b+c@mail.example.in").is_ok());
        assert!(validate_email("asha").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("asha@example").is_err());
        assert!(validate_email("as ha@example.com").is_err());
    }

    #[test]
    fn test_validate_consumer_number() {
        assert!(validate_consumer_number("EL-100200").is_ok());
        assert!(validate_consumer_number("EL1").is_err());
        assert!(validate_consumer_number("el100200").is_err());
        assert!(validate_consumer_number(&"9".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_description_bounds() {
        assert!(matches!(
            validate_description("too short"),
            Err(ValidationError::TooShort { min: 10, .. })
        ));
        assert!(validate_description("0123456789").is_ok());
        assert!(validate_description(&"x".repeat(2000)).is_ok());
        assert!(matches!(
            validate_description(&"x".repeat(2001)),
            Err(ValidationError::TooLong { max: 2000, .. })
        ));
    }

    #[test]
    fn test_validate_document() {
        let mut doc = DocumentRef {
            name: "id-proof.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size_bytes: 2048,
            storage_ref: "uploads/abc".to_string(),
        };
        assert!(validate_document(&doc).is_ok());

        doc.size_bytes = MAX_DOCUMENT_BYTES;
        assert!(validate_document(&doc).is_ok());
        doc.size_bytes = MAX_DOCUMENT_BYTES + 1;
        assert!(validate_document(&doc).is_err());
        doc.size_bytes = 0;
        assert!(validate_document(&doc).is_err());

        doc.size_bytes = 10;
        doc.mime_type = "image/gif".to_string();
        let err = validate_document(&doc).unwrap_err();
        assert_eq!(err.field(), "documents.mime_type");
    }

    #[test]
    fn test_validate_load_and_cylinders() {
        assert!(validate_load_kw("load", dec!(0.5)).is_ok());
        assert!(validate_load_kw("load", dec!(1000)).is_ok());
        assert!(validate_load_kw("load", dec!(0)).is_err());
        assert!(validate_load_kw("load", dec!(1000.01)).is_err());

        assert!(validate_cylinder_count(1).is_ok());
        assert!(validate_cylinder_count(2).is_ok());
        assert!(validate_cylinder_count(0).is_err());
        assert!(validate_cylinder_count(3).is_err());
    }

    #[test]
    fn test_application_service_compatibility() {
        let booking = ApplicationPayload::CylinderBooking {
            applicant: applicant(),
            consumer_number: "GAS-000123".to_string(),
            cylinder_count: 1,
            delivery_address: premises(),
        };
        assert!(validate_application(ServiceType::Gas, &booking).is_ok());
        assert!(matches!(
            validate_application(ServiceType::Electricity, &booking),
            Err(CoreError::ServiceMismatch { .. })
        ));

        let load_change = ApplicationPayload::LoadChange {
            applicant: applicant(),
            consumer_number: "EL-100200".to_string(),
            current_load_kw: dec!(3),
            requested_load_kw: dec!(5),
        };
        assert!(validate_application(ServiceType::Electricity, &load_change).is_ok());
        assert!(validate_application(ServiceType::Water, &load_change).is_err());
    }

    #[test]
    fn test_new_connection_rules() {
        let mut payload = ApplicationPayload::NewConnection {
            applicant: applicant(),
            premises: premises(),
            category: TariffCategory::Residential,
            requested_load_kw: None,
        };
        assert!(validate_application(ServiceType::Water, &payload).is_ok());
        let err = validate_application(ServiceType::Electricity, &payload).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { ref field }) if field == "requested_load_kw"
        ));

        if let ApplicationPayload::NewConnection {
            requested_load_kw,
            category,
            ..
        } = &mut payload
        {
            *requested_load_kw = Some(dec!(4));
            *category = TariffCategory::Agricultural;
        }
        assert!(validate_application(ServiceType::Electricity, &payload).is_ok());
        assert!(matches!(
            validate_application(ServiceType::Water, &payload),
            Err(CoreError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_change_of_name_checks_current_name() {
        let payload = ApplicationPayload::ChangeOfName {
            applicant: applicant(),
            consumer_number: "WT-445566".to_string(),
            current_name: "".to_string(),
            reason: NameChangeReason::Sale,
        };
        let err = validate_application(ServiceType::Water, &payload).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { ref field }) if field == "current_name"
        ));
    }

    #[test]
    fn test_validate_complaint() {
        let contact = ContactDetails {
            name: "Ravi Kumar".to_string(),
            phone: "+919812345678".to_string(),
            email: None,
            address: "4th Cross, Jayanagar".to_string(),
            consumer_number: Some("EL-100200".to_string()),
        };
        assert!(validate_complaint(
            ServiceType::Electricity,
            ComplaintCategory::PowerOutage,
            "No power since 6am in the whole lane",
            &contact
        )
        .is_ok());
        assert!(matches!(
            validate_complaint(
                ServiceType::Water,
                ComplaintCategory::PowerOutage,
                "No power since 6am in the whole lane",
                &contact
            ),
            Err(CoreError::ServiceMismatch { .. })
        ));
        assert!(validate_complaint(
            ServiceType::Electricity,
            ComplaintCategory::Other,
            "short",
            &contact
        )
        .is_err());
    }

    #[test]
    fn test_service_year_range() {
        assert!(validate_service_year(2025).is_ok());
        assert!(validate_service_year(1999).is_err());
    }
}
