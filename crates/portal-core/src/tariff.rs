//! # Tariff Module
//!
//! Slab (tiered) tariffs and the bill calculator.
//!
//! ## Slab Walk
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Residential electricity, 350 units                                     │
//! │                                                                         │
//! │   0 ──────── 100 ─────────────── 300 ─────────────────── ∞              │
//! │   │  @ 5.50   │       @ 7.00      │         @ 8.50                      │
//! │   │ 100 units │     200 units     │  50 units                           │
//! │   │   550.00  │      1400.00      │  425.00                             │
//! │                                                                         │
//! │  energy   = 2375.00                                                     │
//! │  fixed    =   50.00                                                     │
//! │  subtotal = 2425.00                                                     │
//! │  tax 5%   =  121.25                                                     │
//! │  total    = 2546.25                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A slab covers `(lower, upper]`: consumption exactly on a boundary is billed
//! entirely in the lower slab. Every reported amount is rounded independently
//! from the exact decimal intermediate, so `total` never inherits rounding
//! drift from its parts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{ServiceType, TariffCategory};
use crate::validation::{validate_load_kw, validate_units};

// =============================================================================
// Schedule
// =============================================================================

/// One consumption band. `upper_bound: None` is the open-ended last slab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slab {
    pub upper_bound: Option<Decimal>,
    pub rate_per_unit: Decimal,
}

impl Slab {
    pub fn bounded(upper_bound: Decimal, rate_per_unit: Decimal) -> Self {
        Slab {
            upper_bound: Some(upper_bound),
            rate_per_unit,
        }
    }

    pub fn unbounded(rate_per_unit: Decimal) -> Self {
        Slab {
            upper_bound: None,
            rate_per_unit,
        }
    }
}

/// How the fixed (demand) charge of a schedule is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum FixedCharge {
    /// Same amount on every bill.
    Flat(Decimal),
    /// Amount per kW of sanctioned load.
    PerSanctionedKw(Decimal),
}

impl FixedCharge {
    pub fn amount(&self) -> Decimal {
        match self {
            FixedCharge::Flat(amount) | FixedCharge::PerSanctionedKw(amount) => *amount,
        }
    }

    fn resolve(&self, sanctioned_load_kw: Option<Decimal>) -> CoreResult<Decimal> {
        match self {
            FixedCharge::Flat(amount) => Ok(*amount),
            FixedCharge::PerSanctionedKw(per_kw) => {
                let load = sanctioned_load_kw.ok_or_else(|| ValidationError::Required {
                    field: "sanctioned_load_kw".to_string(),
                })?;
                validate_load_kw("sanctioned_load_kw", load)?;
                checked(per_kw.checked_mul(load), "fixed charge")
            }
        }
    }
}

/// Unwraps a checked decimal operation, naming the quantity that overflowed.
fn checked(value: Option<Decimal>, what: &str) -> CoreResult<Decimal> {
    value.ok_or_else(|| CoreError::AmountOverflow {
        amount: what.to_string(),
    })
}

/// Published tariff for one (service, category) pair.
///
/// Construct through [`TariffSchedule::new`], which enforces that the slabs
/// partition `[0, ∞)`: strictly increasing positive bounds, exactly one
/// unbounded slab in last position, non-negative rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffSchedule {
    service: ServiceType,
    category: TariffCategory,
    slabs: Vec<Slab>,
    fixed_charge: FixedCharge,
    tax_percentage: Decimal,
}

impl TariffSchedule {
    pub fn new(
        service: ServiceType,
        category: TariffCategory,
        slabs: Vec<Slab>,
        fixed_charge: FixedCharge,
        tax_percentage: Decimal,
    ) -> CoreResult<Self> {
        if !category.is_offered_for(service) {
            return Err(CoreError::UnknownCategory {
                category: format!("{}/{}", service, category),
            });
        }
        if slabs.is_empty() {
            return Err(invalid("at least one slab is required"));
        }

        let mut previous = Decimal::ZERO;
        let last = slabs.len() - 1;
        for (index, slab) in slabs.iter().enumerate() {
            if slab.rate_per_unit < Decimal::ZERO {
                return Err(invalid(format!("slab {} has a negative rate", index + 1)));
            }
            match slab.upper_bound {
                Some(upper) if index == last => {
                    return Err(invalid(format!(
                        "last slab must be unbounded, found upper bound {}",
                        upper
                    )))
                }
                Some(upper) if upper <= previous => {
                    return Err(invalid(format!(
                        "slab {} upper bound {} must exceed {}",
                        index + 1,
                        upper,
                        previous
                    )))
                }
                Some(upper) => previous = upper,
                None if index != last => {
                    return Err(invalid(format!(
                        "only the last slab may be unbounded (slab {})",
                        index + 1
                    )))
                }
                None => {}
            }
        }

        if fixed_charge.amount() < Decimal::ZERO {
            return Err(invalid("fixed charge must not be negative"));
        }
        if tax_percentage < Decimal::ZERO || tax_percentage > Decimal::ONE_HUNDRED {
            return Err(invalid("tax percentage must be between 0 and 100"));
        }

        Ok(TariffSchedule {
            service,
            category,
            slabs,
            fixed_charge,
            tax_percentage,
        })
    }

    pub fn service(&self) -> ServiceType {
        self.service
    }

    pub fn category(&self) -> TariffCategory {
        self.category
    }

    pub fn slabs(&self) -> &[Slab] {
        &self.slabs
    }

    pub fn fixed_charge(&self) -> FixedCharge {
        self.fixed_charge
    }

    pub fn tax_percentage(&self) -> Decimal {
        self.tax_percentage
    }
}

fn invalid(reason: impl Into<String>) -> CoreError {
    CoreError::InvalidTariff {
        reason: reason.into(),
    }
}

// =============================================================================
// Bill Computation
// =============================================================================

/// Units and charge attributed to one slab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SlabCharge {
    #[ts(as = "String")]
    pub from_units: Decimal,
    #[ts(as = "Option<String>")]
    pub to_units: Option<Decimal>,
    #[ts(as = "String")]
    pub units: Decimal,
    #[ts(as = "String")]
    pub rate_per_unit: Decimal,
    pub amount: Money,
}

/// Itemized result of [`compute_bill`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillComputation {
    #[ts(as = "String")]
    pub units_consumed: Decimal,
    pub energy_charges: Money,
    pub fixed_charges: Money,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub slab_charges: Vec<SlabCharge>,
}

/// Computes a bill for `units_consumed` under `schedule`.
///
/// ## Errors
/// - `units_consumed < 0` → `ValidationError::Negative { field: "units_consumed" }`
/// - per-kW fixed charge without a `sanctioned_load_kw` in `(0, 1000]` → `ValidationError`
/// - a charge too large for `Decimal` or `Money` → `CoreError::AmountOverflow`
///
/// ## Example
/// ```rust
/// use portal_core::tariff::{compute_bill, FixedCharge, Slab, TariffSchedule};
/// use portal_core::{ServiceType, TariffCategory};
/// use rust_decimal::Decimal;
///
/// let schedule = TariffSchedule::new(
///     ServiceType::Electricity,
///     TariffCategory::Residential,
///     vec![
///         Slab::bounded(Decimal::new(100, 0), Decimal::new(550, 2)),
///         Slab::bounded(Decimal::new(300, 0), Decimal::new(700, 2)),
///         Slab::unbounded(Decimal::new(850, 2)),
///     ],
///     FixedCharge::Flat(Decimal::new(50, 0)),
///     Decimal::new(5, 0),
/// )
/// .unwrap();
///
/// let bill = compute_bill(&schedule, Decimal::new(350, 0), None).unwrap();
/// assert_eq!(bill.total_amount.paise(), 254625);
/// ```
pub fn compute_bill(
    schedule: &TariffSchedule,
    units_consumed: Decimal,
    sanctioned_load_kw: Option<Decimal>,
) -> CoreResult<BillComputation> {
    validate_units(units_consumed)?;

    let mut remaining = units_consumed;
    let mut lower = Decimal::ZERO;
    let mut energy = Decimal::ZERO;
    let mut slab_charges = Vec::new();

    for slab in &schedule.slabs {
        let units_in_slab = match slab.upper_bound {
            Some(upper) => remaining.min(upper - lower),
            None => remaining,
        };
        if units_in_slab <= Decimal::ZERO {
            break;
        }

        let amount = checked(units_in_slab.checked_mul(slab.rate_per_unit), "energy charge")?;
        energy = checked(energy.checked_add(amount), "energy charge")?;
        remaining -= units_in_slab;
        slab_charges.push(SlabCharge {
            from_units: lower,
            to_units: slab.upper_bound,
            units: units_in_slab,
            rate_per_unit: slab.rate_per_unit,
            amount: Money::from_decimal(amount)?,
        });

        match slab.upper_bound {
            Some(upper) => lower = upper,
            None => break,
        }
    }

    let fixed = schedule.fixed_charge.resolve(sanctioned_load_kw)?;
    let subtotal = checked(energy.checked_add(fixed), "subtotal")?;
    let tax = checked(subtotal.checked_mul(schedule.tax_percentage), "tax")? / Decimal::ONE_HUNDRED;
    let total = checked(subtotal.checked_add(tax), "total")?;

    Ok(BillComputation {
        units_consumed,
        energy_charges: Money::from_decimal(energy)?,
        fixed_charges: Money::from_decimal(fixed)?,
        subtotal: Money::from_decimal(subtotal)?,
        tax_amount: Money::from_decimal(tax)?,
        total_amount: Money::from_decimal(total)?,
        slab_charges,
    })
}

// =============================================================================
// Meter Readings
// =============================================================================

/// Two successive meter readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterReading {
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
}

impl MeterReading {
    /// Units consumed between the two readings.
    pub fn units_consumed(&self) -> Result<Decimal, ValidationError> {
        if self.previous_reading < Decimal::ZERO {
            return Err(ValidationError::Negative {
                field: "previous_reading".to_string(),
            });
        }
        if self.current_reading < self.previous_reading {
            return Err(ValidationError::OutOfRange {
                field: "current_reading".to_string(),
                min: self.previous_reading.to_string(),
                max: "unbounded".to_string(),
            });
        }
        Ok(self.current_reading - self.previous_reading)
    }
}

// =============================================================================
// Tariff Book
// =============================================================================

/// Every schedule in force, keyed by (service, category).
#[derive(Debug, Clone, Default)]
pub struct TariffBook {
    schedules: BTreeMap<(ServiceType, TariffCategory), TariffSchedule>,
}

impl TariffBook {
    pub fn new() -> Self {
        TariffBook::default()
    }

    /// Adds or replaces the schedule for its (service, category).
    pub fn insert(&mut self, schedule: TariffSchedule) {
        self.schedules
            .insert((schedule.service, schedule.category), schedule);
    }

    pub fn get(
        &self,
        service: ServiceType,
        category: TariffCategory,
    ) -> CoreResult<&TariffSchedule> {
        self.schedules
            .get(&(service, category))
            .ok_or_else(|| CoreError::UnknownCategory {
                category: format!("{}/{}", service, category),
            })
    }

    pub fn schedules(&self) -> impl Iterator<Item = &TariffSchedule> {
        self.schedules.values()
    }

    /// Looks up the schedule and computes the bill in one step.
    pub fn compute(
        &self,
        service: ServiceType,
        category: TariffCategory,
        units_consumed: Decimal,
        sanctioned_load_kw: Option<Decimal>,
    ) -> CoreResult<BillComputation> {
        compute_bill(self.get(service, category)?, units_consumed, sanctioned_load_kw)
    }

    /// The tariffs the portal ships with; the seed tool writes these rows.
    pub fn standard() -> CoreResult<Self> {
        let d = Decimal::new;
        let mut book = TariffBook::new();

        // Electricity (per kWh)
        book.insert(TariffSchedule::new(
            ServiceType::Electricity,
            TariffCategory::Residential,
            vec![
                Slab::bounded(d(100, 0), d(550, 2)),
                Slab::bounded(d(300, 0), d(700, 2)),
                Slab::unbounded(d(850, 2)),
            ],
            FixedCharge::Flat(d(50, 0)),
            d(5, 0),
        )?);
        book.insert(TariffSchedule::new(
            ServiceType::Electricity,
            TariffCategory::Commercial,
            vec![
                Slab::bounded(d(200, 0), d(800, 2)),
                Slab::unbounded(d(950, 2)),
            ],
            FixedCharge::PerSanctionedKw(d(120, 0)),
            d(9, 0),
        )?);
        book.insert(TariffSchedule::new(
            ServiceType::Electricity,
            TariffCategory::Industrial,
            vec![Slab::unbounded(d(725, 2))],
            FixedCharge::PerSanctionedKw(d(250, 0)),
            d(9, 0),
        )?);
        book.insert(TariffSchedule::new(
            ServiceType::Electricity,
            TariffCategory::Agricultural,
            vec![
                Slab::bounded(d(500, 0), d(150, 2)),
                Slab::unbounded(d(300, 2)),
            ],
            FixedCharge::Flat(d(20, 0)),
            Decimal::ZERO,
        )?);

        // Water (per kilolitre)
        book.insert(TariffSchedule::new(
            ServiceType::Water,
            TariffCategory::Residential,
            vec![
                Slab::bounded(d(10, 0), d(700, 2)),
                Slab::bounded(d(25, 0), d(1200, 2)),
                Slab::unbounded(d(2000, 2)),
            ],
            FixedCharge::Flat(d(75, 0)),
            Decimal::ZERO,
        )?);
        book.insert(TariffSchedule::new(
            ServiceType::Water,
            TariffCategory::Commercial,
            vec![Slab::bounded(d(50, 0), d(3000, 2)), Slab::unbounded(d(4500, 2))],
            FixedCharge::Flat(d(250, 0)),
            d(18, 0),
        )?);
        book.insert(TariffSchedule::new(
            ServiceType::Water,
            TariffCategory::Industrial,
            vec![Slab::unbounded(d(6000, 2))],
            FixedCharge::Flat(d(1000, 0)),
            d(18, 0),
        )?);

        // Piped gas (per SCM)
        book.insert(TariffSchedule::new(
            ServiceType::Gas,
            TariffCategory::Residential,
            vec![Slab::bounded(d(30, 0), d(4850, 2)), Slab::unbounded(d(5600, 2))],
            FixedCharge::Flat(d(40, 0)),
            d(5, 0),
        )?);
        book.insert(TariffSchedule::new(
            ServiceType::Gas,
            TariffCategory::Commercial,
            vec![Slab::unbounded(d(7200, 2))],
            FixedCharge::Flat(d(150, 0)),
            d(12, 0),
        )?);
        book.insert(TariffSchedule::new(
            ServiceType::Gas,
            TariffCategory::Industrial,
            vec![Slab::unbounded(d(6500, 2))],
            FixedCharge::Flat(d(500, 0)),
            d(12, 0),
        )?);

        Ok(book)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
