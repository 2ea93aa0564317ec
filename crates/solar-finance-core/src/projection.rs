use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SolarFinanceError;
use crate::project::{FinancingTerms, ProjectParameters};
use crate::types::*;
use crate::SolarFinanceResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Costs and cash flow for one operating year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearCosts {
    /// 1-indexed project year
    pub year: u32,
    pub cost_without_system: Money,
    pub cost_with_system: Money,
    pub savings: Money,
    pub opex: Money,
    pub net_cash_flow: Money,
}

/// Year-by-year projection. Production is kept apart from costs; both vectors hold one
/// entry per operating year and `cash_flows` additionally starts with year 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// kWh produced in years 1..=L
    pub production: Vec<Energy>,
    pub costs: Vec<YearCosts>,
    /// L + 1 entries, year 0 first
    pub cash_flows: Vec<Money>,
}

impl Projection {
    pub fn lifetime(&self) -> usize {
        self.costs.len()
    }

    pub fn initial_cash_flow(&self) -> Money {
        self.cash_flows.first().copied().unwrap_or(Decimal::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Project energy, costs and net cash flow over the system lifetime.
///
/// Every escalating series is compounded by repeated multiplication from its year-1
/// value; nothing is rounded between years. A figure that leaves the Decimal range
/// fails the whole projection with [`SolarFinanceError::Computation`].
pub fn project(params: &ProjectParameters) -> SolarFinanceResult<Projection> {
    let lifetime = params.lifetime_years as usize;
    let mut production = Vec::with_capacity(lifetime);
    let mut costs = Vec::with_capacity(lifetime);
    let mut cash_flows = Vec::with_capacity(lifetime + 1);

    cash_flows.push(-params.upfront_capex());

    let retention = Decimal::ONE - params.degradation_rate;
    let tariff_growth = Decimal::ONE + params.tariff_escalation_rate;
    let opex_growth = Decimal::ONE + params.om_inflation_rate;
    let ppa_growth = match params.financing {
        FinancingTerms::Ppa {
            escalation_rate, ..
        } => Decimal::ONE + escalation_rate,
        FinancingTerms::Capex { .. } => Decimal::ONE,
    };

    let mut energy = params.first_year_energy()?;
    let mut cost_without = params.baseline_annual_cost;
    let mut base_opex = params.annual_opex;
    let mut ppa_price = match params.financing {
        FinancingTerms::Ppa { initial_price, .. } => initial_price,
        FinancingTerms::Capex { .. } => Decimal::ZERO,
    };

    for year in 1..=params.lifetime_years {
        if year > 1 {
            energy = checked(energy.checked_mul(retention), "energy", year)?;
            cost_without = checked(cost_without.checked_mul(tariff_growth), "cost without system", year)?;
            base_opex = checked(base_opex.checked_mul(opex_growth), "opex", year)?;
            ppa_price = checked(ppa_price.checked_mul(ppa_growth), "PPA price", year)?;
        }

        let (opex, cost_with) = match params.financing {
            FinancingTerms::Capex { .. } => (base_opex, base_opex),
            // O&M is bundled in the PPA price.
            FinancingTerms::Ppa { .. } => (
                Decimal::ZERO,
                checked(energy.checked_mul(ppa_price), "cost with system", year)?,
            ),
        };
        let savings = checked(cost_without.checked_sub(cost_with), "savings", year)?;
        let net_cash_flow = match params.financing {
            FinancingTerms::Capex { .. } => {
                checked(savings.checked_sub(base_opex), "net cash flow", year)?
            }
            FinancingTerms::Ppa { .. } => savings,
        };

        production.push(energy);
        costs.push(YearCosts {
            year,
            cost_without_system: cost_without,
            cost_with_system: cost_with,
            savings,
            opex,
            net_cash_flow,
        });
        cash_flows.push(net_cash_flow);
    }

    Ok(Projection {
        production,
        costs,
        cash_flows,
    })
}

fn checked(value: Option<Decimal>, what: &str, year: u32) -> SolarFinanceResult<Decimal> {
    value.ok_or_else(|| {
        SolarFinanceError::Computation(format!(
            "{what} in year {year} exceeds the representable range"
        ))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
