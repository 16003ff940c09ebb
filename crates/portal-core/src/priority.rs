//! # Complaint Priority
//!
//! Some complaint categories are safety or supply issues and get a fixed
//! priority no matter what the consumer selected. The table below is the
//! single source of that rule.
//!
//! ```text
//! ┌───────────────────────────────┬──────────┐
//! │  category                     │ priority │
//! ├───────────────────────────────┼──────────┤
//! │  power_outage                 │  high    │
//! │  no_water_supply              │  high    │
//! │  supply_interrupted           │  high    │
//! │  meter_burnt                  │  urgent  │
//! │  live_wire_hazard             │  urgent  │
//! │  gas_leak                     │  urgent  │
//! │  contaminated_water           │  urgent  │
//! └───────────────────────────────┴──────────┘
//! ```
//!
//! Every other category keeps the requested priority, or `medium`.

use crate::types::{ComplaintCategory, Priority};

/// Categories whose priority is forced, regardless of the request.
pub const PRIORITY_OVERRIDES: &[(ComplaintCategory, Priority)] = &[
    (ComplaintCategory::PowerOutage, Priority::High),
    (ComplaintCategory::NoWaterSupply, Priority::High),
    (ComplaintCategory::SupplyInterrupted, Priority::High),
    (ComplaintCategory::MeterBurnt, Priority::Urgent),
    (ComplaintCategory::LiveWireHazard, Priority::Urgent),
    (ComplaintCategory::GasLeak, Priority::Urgent),
    (ComplaintCategory::ContaminatedWater, Priority::Urgent),
];

/// The forced priority for `category`, if it has one.
pub fn override_for(category: ComplaintCategory) -> Option<Priority> {
    PRIORITY_OVERRIDES
        .iter()
        .find(|(overridden, _)| *overridden == category)
        .map(|(_, priority)| *priority)
}

/// Resolves the priority a new complaint is filed with.
///
/// An override wins even when the consumer asked for something higher.
pub fn assign_priority(category: ComplaintCategory, requested: Option<Priority>) -> Priority {
    override_for(category).unwrap_or_else(|| requested.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUESTS: [Option<Priority>; 5] = [
        None,
        Some(Priority::Low),
        Some(Priority::Medium),
        Some(Priority::High),
        Some(Priority::Urgent),
    ];

    #[test]
    fn test_every_category_and_request() {
        for category in ComplaintCategory::ALL {
            for requested in REQUESTS {
                let expected = match category {
                    ComplaintCategory::PowerOutage
                    | ComplaintCategory::NoWaterSupply
                    | ComplaintCategory::SupplyInterrupted => Priority::High,
                    ComplaintCategory::MeterBurnt
                    | ComplaintCategory::LiveWireHazard
                    | ComplaintCategory::GasLeak
                    | ComplaintCategory::ContaminatedWater => Priority::Urgent,
                    _ => requested.unwrap_or(Priority::Medium),
                };
                assert_eq!(
                    assign_priority(category, requested),
                    expected,
                    "{} with {:?}",
                    category,
                    requested
                );
            }
        }
    }

    #[test]
    fn test_override_beats_higher_request() {
        assert_eq!(
            assign_priority(ComplaintCategory::PowerOutage, Some(Priority::Urgent)),
            Priority::High
        );
    }

    #[test]
    fn test_overrides_are_unique() {
        for (index, (category, _)) in PRIORITY_OVERRIDES.iter().enumerate() {
            assert!(
                PRIORITY_OVERRIDES[index + 1..]
                    .iter()
                    .all(|(other, _)| other != category),
                "{} listed twice",
                category
            );
        }
    }
}
