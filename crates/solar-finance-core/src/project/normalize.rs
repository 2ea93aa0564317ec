use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::project::inputs::{FinancingTerms, ProjectInputs, ProjectParameters};
use crate::types::*;
use crate::{SolarFinanceError, SolarFinanceResult};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_PERFORMANCE_RATIO: Rate = dec!(0.82);
pub const DEFAULT_DEGRADATION_RATE: Rate = dec!(0.007);
pub const DEFAULT_LIFETIME_YEARS: u32 = 25;
pub const DEFAULT_DISCOUNT_RATE: Rate = dec!(0.10);
pub const DEFAULT_OM_INFLATION_RATE: Rate = dec!(0.03);
pub const DEFAULT_TARIFF_ESCALATION_RATE: Rate = dec!(0.07);
pub const DEFAULT_PPA_ESCALATION_RATE: Rate = dec!(0.02);
pub const DEFAULT_ANNUAL_OPEX: Money = dec!(0);
/// 5.5 peak-sun-hours per day over a year.
pub const DEFAULT_REFERENCE_YIELD: Decimal = dec!(2007.5);
/// Grid energy price used when the bill does not provide a cost figure.
pub const DEFAULT_GRID_TARIFF: Money = dec!(2.8);

pub const MAX_LIFETIME_YEARS: i64 = 60;
/// Ceiling on every monetary, energy and capacity input.
pub const MAX_INPUT_MAGNITUDE: Decimal = dec!(1_000_000_000_000);
const HOURS_PER_YEAR: Decimal = dec!(8760);
/// Rates (discount, inflation, escalation) must lie in (RATE_FLOOR, RATE_CEILING].
const RATE_FLOOR: Rate = dec!(-0.5);
const RATE_CEILING: Rate = dec!(1);

/// A validated parameter set plus the audit lines describing how it was derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedParameters {
    pub params: ProjectParameters,
    pub audit: Vec<String>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Turn raw bill figures and overrides into a complete [`ProjectParameters`].
///
/// Missing fields receive the documented defaults and each default applied is
/// recorded in the audit. Rejects non-positive capacity or lifetime, a missing
/// mode-required cost field, and out-of-range rates.
pub fn normalize(inputs: &ProjectInputs) -> SolarFinanceResult<NormalizedParameters> {
    let mut audit: Vec<String> = Vec::new();

    validate_magnitudes(inputs)?;

    let performance_ratio = or_default(
        inputs.performance_ratio,
        DEFAULT_PERFORMANCE_RATIO,
        "performance_ratio",
        &mut audit,
    );
    if performance_ratio <= Decimal::ZERO || performance_ratio > Decimal::ONE {
        return Err(SolarFinanceError::invalid(
            "performance_ratio",
            "must be in (0, 1]",
        ));
    }

    let degradation_rate = or_default(
        inputs.degradation_rate,
        DEFAULT_DEGRADATION_RATE,
        "degradation_rate",
        &mut audit,
    );
    if degradation_rate < Decimal::ZERO || degradation_rate >= dec!(0.5) {
        return Err(SolarFinanceError::invalid(
            "degradation_rate",
            "must be in [0, 0.5)",
        ));
    }

    let reference_yield = or_default(
        inputs.reference_yield_kwh_per_kwp,
        DEFAULT_REFERENCE_YIELD,
        "reference_yield_kwh_per_kwp",
        &mut audit,
    );
    if reference_yield <= Decimal::ZERO || reference_yield > HOURS_PER_YEAR {
        return Err(SolarFinanceError::invalid(
            "reference_yield_kwh_per_kwp",
            "must be in (0, 8760]",
        ));
    }

    let capacity_kwp = resolve_capacity(inputs, performance_ratio, reference_yield, &mut audit)?;

    let lifetime_years = resolve_lifetime(inputs.lifetime_years, &mut audit)?;

    let annual_opex = or_default(
        inputs.annual_opex,
        DEFAULT_ANNUAL_OPEX,
        "annual_opex",
        &mut audit,
    );

    let discount_rate = or_default(
        inputs.discount_rate,
        DEFAULT_DISCOUNT_RATE,
        "discount_rate",
        &mut audit,
    );
    check_rate("discount_rate", discount_rate)?;

    let om_inflation_rate = or_default(
        inputs.om_inflation_rate,
        DEFAULT_OM_INFLATION_RATE,
        "om_inflation_rate",
        &mut audit,
    );
    check_rate("om_inflation_rate", om_inflation_rate)?;

    let tariff_escalation_rate = or_default(
        inputs.tariff_escalation_rate,
        DEFAULT_TARIFF_ESCALATION_RATE,
        "tariff_escalation_rate",
        &mut audit,
    );
    check_rate("tariff_escalation_rate", tariff_escalation_rate)?;

    let financing = resolve_financing(inputs, &mut audit)?;

    let currency = match inputs.currency.as_deref() {
        Some(code) if !code.trim().is_empty() => Currency::from_code(code),
        _ => {
            audit.push(format!(
                "default applied: currency = {}",
                Currency::default().code()
            ));
            Currency::default()
        }
    };

    // capacity, PR and yield are bounded, so this product fits.
    let first_year_energy = capacity_kwp * performance_ratio * reference_yield;
    let baseline_annual_cost = resolve_baseline(inputs, first_year_energy, &mut audit);

    let params = ProjectParameters {
        capacity_kwp,
        performance_ratio,
        degradation_rate,
        reference_yield_kwh_per_kwp: reference_yield,
        annual_opex,
        lifetime_years,
        discount_rate,
        om_inflation_rate,
        tariff_escalation_rate,
        baseline_annual_cost,
        financing,
        monthly_consumption_kwh: inputs.monthly_consumption_kwh,
        peak_demand_kw: inputs.peak_demand_kw,
        currency,
    };

    Ok(NormalizedParameters { params, audit })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn or_default<T: Copy + Display>(
    value: Option<T>,
    default: T,
    field: &str,
    audit: &mut Vec<String>,
) -> T {
    match value {
        Some(v) => v,
        None => {
            audit.push(format!("default applied: {field} = {default}"));
            default
        }
    }
}

fn check_rate(field: &str, rate: Rate) -> SolarFinanceResult<()> {
    if rate <= RATE_FLOOR || rate > RATE_CEILING {
        return Err(SolarFinanceError::invalid(field, "must be in (-0.5, 1]"));
    }
    Ok(())
}

/// Monetary and physical figures: never negative, never above [`MAX_INPUT_MAGNITUDE`].
fn validate_magnitudes(inputs: &ProjectInputs) -> SolarFinanceResult<()> {
    let fields = [
        ("capacity_kwp", inputs.capacity_kwp),
        ("monthly_consumption_kwh", inputs.monthly_consumption_kwh),
        ("peak_demand_kw", inputs.peak_demand_kw),
        ("monthly_bill", inputs.monthly_bill),
        ("grid_tariff", inputs.grid_tariff),
        ("baseline_annual_cost", inputs.baseline_annual_cost),
        ("annual_opex", inputs.annual_opex),
        ("capex", inputs.capex),
        ("ppa_initial_price", inputs.ppa_initial_price),
    ];
    for (field, value) in fields {
        match value {
            Some(v) if v < Decimal::ZERO => {
                return Err(SolarFinanceError::invalid(field, "cannot be negative"));
            }
            Some(v) if v > MAX_INPUT_MAGNITUDE => {
                return Err(SolarFinanceError::invalid(
                    field,
                    format!("cannot exceed {MAX_INPUT_MAGNITUDE}"),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Explicit capacity must be positive. Without one, the system is sized to cover
/// the annual consumption on the bill.
fn resolve_capacity(
    inputs: &ProjectInputs,
    performance_ratio: Rate,
    reference_yield: Decimal,
    audit: &mut Vec<String>,
) -> SolarFinanceResult<Decimal> {
    match (inputs.capacity_kwp, inputs.monthly_consumption_kwh) {
        (Some(capacity), _) => {
            if capacity <= Decimal::ZERO {
                return Err(SolarFinanceError::invalid(
                    "capacity_kwp",
                    "must be positive",
                ));
            }
            Ok(capacity)
        }
        (None, Some(consumption)) => {
            let capacity = (consumption * dec!(12))
                .checked_div(performance_ratio * reference_yield)
                .map(|c| c.round_dp(2))
                .filter(|c| *c <= MAX_INPUT_MAGNITUDE)
                .ok_or_else(|| {
                    SolarFinanceError::invalid(
                        "capacity_kwp",
                        format!("sized from consumption would exceed {MAX_INPUT_MAGNITUDE} kWp"),
                    )
                })?;
            if capacity <= Decimal::ZERO {
                return Err(SolarFinanceError::invalid(
                    "capacity_kwp",
                    "cannot be sized from a zero consumption",
                ));
            }
            audit.push(format!(
                "capacity_kwp sized from consumption: {capacity} kWp covers {} kWh/yr",
                consumption * dec!(12)
            ));
            Ok(capacity)
        }
        (None, None) => Err(SolarFinanceError::invalid(
            "capacity_kwp",
            "is required when no monthly consumption is given",
        )),
    }
}

fn resolve_lifetime(lifetime: Option<i64>, audit: &mut Vec<String>) -> SolarFinanceResult<u32> {
    let Some(years) = lifetime else {
        audit.push(format!(
            "default applied: lifetime_years = {DEFAULT_LIFETIME_YEARS}"
        ));
        return Ok(DEFAULT_LIFETIME_YEARS);
    };
    if years <= 0 {
        return Err(SolarFinanceError::invalid(
            "lifetime_years",
            "must be at least 1 year",
        ));
    }
    if years > MAX_LIFETIME_YEARS {
        return Err(SolarFinanceError::invalid(
            "lifetime_years",
            format!("cannot exceed {MAX_LIFETIME_YEARS} years"),
        ));
    }
    Ok(years as u32)
}

/// Pick the financing mode (explicit, else inferred from the cost fields) and collect
/// the cost terms it requires. Cost fields of the other mode are ignored.
fn resolve_financing(
    inputs: &ProjectInputs,
    audit: &mut Vec<String>,
) -> SolarFinanceResult<FinancingTerms> {
    let mode = match inputs.mode.as_deref() {
        Some(raw) => FinancingMode::parse(raw).ok_or_else(|| {
            SolarFinanceError::invalid("mode", format!("'{raw}' is not CAPEX or PPA"))
        })?,
        None => {
            let inferred = if inputs.capex.is_none() && inputs.ppa_initial_price.is_some() {
                FinancingMode::Ppa
            } else {
                FinancingMode::Capex
            };
            audit.push(format!("mode inferred from cost fields: {inferred}"));
            inferred
        }
    };

    match mode {
        FinancingMode::Capex => {
            let capex = inputs.capex.ok_or_else(|| {
                SolarFinanceError::invalid("capex", "is required in CAPEX mode")
            })?;
            if inputs.ppa_initial_price.is_some() || inputs.ppa_escalation_rate.is_some() {
                audit.push("PPA fields ignored in CAPEX mode".into());
            }
            Ok(FinancingTerms::Capex { capex })
        }
        FinancingMode::Ppa => {
            let initial_price = inputs.ppa_initial_price.ok_or_else(|| {
                SolarFinanceError::invalid("ppa_initial_price", "is required in PPA mode")
            })?;
            let escalation_rate = or_default(
                inputs.ppa_escalation_rate,
                DEFAULT_PPA_ESCALATION_RATE,
                "ppa_escalation_rate",
                audit,
            );
            check_rate("ppa_escalation_rate", escalation_rate)?;
            if inputs.capex.is_some() {
                audit.push("capex ignored in PPA mode".into());
            }
            Ok(FinancingTerms::Ppa {
                initial_price,
                escalation_rate,
            })
        }
    }
}

/// Year-1 cost of electricity without the system, from the most specific figure
/// available.
fn resolve_baseline(
    inputs: &ProjectInputs,
    first_year_energy: Energy,
    audit: &mut Vec<String>,
) -> Money {
    if let Some(baseline) = inputs.baseline_annual_cost {
        return baseline;
    }
    if let Some(bill) = inputs.monthly_bill {
        let baseline = bill * dec!(12);
        audit.push(format!(
            "baseline_annual_cost from monthly bill: {baseline}"
        ));
        return baseline;
    }

    let tariff = or_default(
        inputs.grid_tariff,
        DEFAULT_GRID_TARIFF,
        "grid_tariff",
        audit,
    );
    match inputs.monthly_consumption_kwh {
        Some(consumption) => {
            let baseline = consumption * dec!(12) * tariff;
            audit.push(format!(
                "baseline_annual_cost from consumption x tariff: {baseline}"
            ));
            baseline
        }
        None => {
            let baseline = first_year_energy * tariff;
            audit.push(format!(
                "baseline_annual_cost from displaced year-1 production x tariff: {baseline}"
            ));
            baseline
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn capex_inputs() -> ProjectInputs {
        ProjectInputs {
            capacity_kwp: Some(dec!(500)),
            capex: Some(dec!(8_000_000)),
            annual_opex: Some(dec!(80_000)),
            mode: Some("CAPEX".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_filled_and_audited() {
        let normalized = normalize(&capex_inputs()).unwrap();
        let p = &normalized.params;
        assert_eq!(p.performance_ratio, DEFAULT_PERFORMANCE_RATIO);
        assert_eq!(p.degradation_rate, DEFAULT_DEGRADATION_RATE);
        assert_eq!(p.lifetime_years, 25);
        assert_eq!(p.discount_rate, dec!(0.10));
        assert_eq!(p.om_inflation_rate, dec!(0.03));
        assert_eq!(p.tariff_escalation_rate, dec!(0.07));
        assert_eq!(p.currency, Currency::MXN);
        assert!(normalized
            .audit
            .iter()
            .any(|line| line == "default applied: performance_ratio = 0.82"));
        assert!(normalized
            .audit
            .iter()
            .any(|line| line == "default applied: lifetime_years = 25"));
    }

    #[test]
    fn test_overrides_are_not_audited_as_defaults() {
        let mut inputs = capex_inputs();
        inputs.discount_rate = Some(dec!(0.08));
        let normalized = normalize(&inputs).unwrap();
        assert_eq!(normalized.params.discount_rate, dec!(0.08));
        assert!(!normalized
            .audit
            .iter()
            .any(|line| line.contains("discount_rate")));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut inputs = capex_inputs();
        inputs.capacity_kwp = Some(dec!(0));
        let err = normalize(&inputs).unwrap_err();
        assert!(matches!(
            err,
            SolarFinanceError::InvalidParameter { ref field, .. } if field == "capacity_kwp"
        ));
    }

    #[test]
    fn test_non_positive_lifetime_rejected() {
        for years in [0, -3] {
            let mut inputs = capex_inputs();
            inputs.lifetime_years = Some(years);
            let err = normalize(&inputs).unwrap_err();
            assert!(matches!(
                err,
                SolarFinanceError::InvalidParameter { ref field, .. } if field == "lifetime_years"
            ));
        }
    }

    #[test]
    fn test_capex_required_in_capex_mode() {
        let mut inputs = capex_inputs();
        inputs.capex = None;
        let err = normalize(&inputs).unwrap_err();
        assert!(matches!(
            err,
            SolarFinanceError::InvalidParameter { ref field, .. } if field == "capex"
        ));
    }

    #[test]
    fn test_ppa_price_required_in_ppa_mode() {
        let mut inputs = capex_inputs();
        inputs.mode = Some("ppa".into());
        let err = normalize(&inputs).unwrap_err();
        assert!(matches!(
            err,
            SolarFinanceError::InvalidParameter { ref field, .. } if field == "ppa_initial_price"
        ));
    }

    #[test]
    fn test_ppa_ignores_capex() {
        let mut inputs = capex_inputs();
        inputs.mode = Some("PPA".into());
        inputs.ppa_initial_price = Some(dec!(2.2));
        let normalized = normalize(&inputs).unwrap();
        assert_eq!(
            normalized.params.financing,
            FinancingTerms::Ppa {
                initial_price: dec!(2.2),
                escalation_rate: DEFAULT_PPA_ESCALATION_RATE,
            }
        );
        assert_eq!(normalized.params.upfront_capex(), Decimal::ZERO);
        assert!(normalized
            .audit
            .contains(&"capex ignored in PPA mode".to_string()));
    }

    #[test]
    fn test_mode_inferred_from_ppa_price() {
        let inputs = ProjectInputs {
            capacity_kwp: Some(dec!(100)),
            ppa_initial_price: Some(dec!(2.2)),
            ..Default::default()
        };
        let normalized = normalize(&inputs).unwrap();
        assert_eq!(normalized.params.mode(), FinancingMode::Ppa);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let mut inputs = capex_inputs();
        inputs.mode = Some("lease".into());
        assert!(normalize(&inputs).is_err());
    }

    #[test]
    fn test_capacity_sized_from_consumption() {
        let inputs = ProjectInputs {
            monthly_consumption_kwh: Some(dec!(10_000)),
            capex: Some(dec!(1_000_000)),
            ..Default::default()
        };
        let normalized = normalize(&inputs).unwrap();
        // 120,000 kWh / (0.82 * 2007.5) ≈ 72.90 kWp
        assert_eq!(normalized.params.capacity_kwp, dec!(72.90));
        // Baseline from consumption x default tariff
        assert_eq!(normalized.params.baseline_annual_cost, dec!(336_000));
    }

    #[test]
    fn test_baseline_priority() {
        let mut inputs = capex_inputs();
        inputs.monthly_bill = Some(dec!(50_000));
        inputs.monthly_consumption_kwh = Some(dec!(20_000));
        assert_eq!(
            normalize(&inputs).unwrap().params.baseline_annual_cost,
            dec!(600_000)
        );

        inputs.baseline_annual_cost = Some(dec!(123));
        assert_eq!(
            normalize(&inputs).unwrap().params.baseline_annual_cost,
            dec!(123)
        );
    }

    #[test]
    fn test_baseline_from_production_without_bill() {
        let normalized = normalize(&capex_inputs()).unwrap();
        let expected = dec!(500) * dec!(0.82) * dec!(2007.5) * DEFAULT_GRID_TARIFF;
        assert_eq!(normalized.params.baseline_annual_cost, expected);
    }

    #[test]
    fn test_performance_ratio_range() {
        let mut inputs = capex_inputs();
        inputs.performance_ratio = Some(dec!(1.2));
        assert!(normalize(&inputs).is_err());
        inputs.performance_ratio = Some(dec!(1));
        assert!(normalize(&inputs).is_ok());
    }

    #[test]
    fn test_negative_opex_rejected() {
        let mut inputs = capex_inputs();
        inputs.annual_opex = Some(dec!(-1));
        assert!(normalize(&inputs).is_err());
    }

    #[test]
    fn test_oversized_capacity_rejected() {
        let mut inputs = capex_inputs();
        inputs.capacity_kwp = Some(dec!(100_000_000_000_000_000_000_000_000));
        inputs.capex = Some(dec!(1));
        match normalize(&inputs).unwrap_err() {
            SolarFinanceError::InvalidParameter { field, .. } => assert_eq!(field, "capacity_kwp"),
            other => panic!("Expected InvalidParameter, got {other:?}"),
        }

        inputs.capacity_kwp = Some(MAX_INPUT_MAGNITUDE);
        assert!(normalize(&inputs).is_ok());
    }

    #[test]
    fn test_oversized_bill_rejected() {
        let mut inputs = capex_inputs();
        inputs.monthly_bill = Some(dec!(10_000_000_000_000));
        assert!(normalize(&inputs).is_err());
    }

    #[test]
    fn test_sizing_beyond_ceiling_rejected() {
        let inputs = ProjectInputs {
            monthly_consumption_kwh: Some(MAX_INPUT_MAGNITUDE),
            performance_ratio: Some(dec!(0.0000000001)),
            reference_yield_kwh_per_kwp: Some(dec!(0.0000000001)),
            capex: Some(dec!(1)),
            ..Default::default()
        };
        match normalize(&inputs).unwrap_err() {
            SolarFinanceError::InvalidParameter { field, .. } => assert_eq!(field, "capacity_kwp"),
            other => panic!("Expected InvalidParameter, got {other:?}"),
        }
    }
}
