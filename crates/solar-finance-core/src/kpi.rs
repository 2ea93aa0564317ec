use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::project::ProjectParameters;
use crate::projection::Projection;
use crate::time_value::{discount_factors, irr};
use crate::error::SolarFinanceError;
use crate::types::*;
use crate::SolarFinanceResult;

/// Summary investment metrics. `None` means the metric is undefined for this project
/// (no sign change, never paid back, zero base), which is distinct from zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub npv: Option<Money>,
    pub irr: Option<Rate>,
    /// First year (0..=L) at which cumulative cash flow is non-negative
    pub payback_simple: Option<u32>,
    /// Same as `payback_simple` on discounted cash flows
    pub payback_discounted: Option<u32>,
    pub roi: Option<Rate>,
    /// Cost per kWh over the lifetime, discounted
    pub lcoe: Option<Money>,
}

impl Kpis {
    pub fn is_empty(&self) -> bool {
        *self == Kpis::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub kpis: Kpis,
    /// Explanations for metrics that came out absent
    pub notes: Vec<String>,
}

/// Compute every KPI from a projection of `params`.
pub fn aggregate(params: &ProjectParameters, projection: &Projection) -> SolarFinanceResult<KpiReport> {
    let mut notes = Vec::new();

    if projection.lifetime() == 0 {
        notes.push("lifetime is zero: no KPIs computed".to_string());
        return Ok(KpiReport {
            kpis: Kpis::default(),
            notes,
        });
    }

    let factors = discount_factors(params.discount_rate, projection.lifetime() as u32)?;
    let discounted = projection
        .cash_flows
        .iter()
        .zip(&factors)
        .map(|(cf, f)| cf.checked_div(*f).ok_or_else(|| out_of_range("discounted cash flow")))
        .collect::<SolarFinanceResult<Vec<Money>>>()?;

    let npv = checked_sum(discounted.iter().copied(), "npv")?;

    let irr = irr(&projection.cash_flows);
    if irr.is_none() {
        notes.push("irr absent: cash flows change sign nowhere in [-99%, 1000%]".to_string());
    }

    let payback_simple = payback_year(&projection.cash_flows)?;
    if payback_simple.is_none() {
        notes.push("simple payback not reached within the lifetime".to_string());
    }
    let payback_discounted = payback_year(&discounted)?;
    if payback_discounted.is_none() {
        notes.push("discounted payback not reached within the lifetime".to_string());
    }

    let roi = roi(params, projection)?;
    if roi.is_none() {
        notes.push("roi absent: investment base is zero".to_string());
    }

    let lcoe = lcoe(projection, &factors)?;
    if lcoe.is_none() {
        notes.push("lcoe absent: discounted lifetime energy is zero".to_string());
    }

    Ok(KpiReport {
        kpis: Kpis {
            npv: Some(npv),
            irr,
            payback_simple,
            payback_discounted,
            roi,
            lcoe,
        },
        notes,
    })
}

fn out_of_range(what: &str) -> SolarFinanceError {
    SolarFinanceError::Computation(format!("{what} exceeds the representable range"))
}

fn checked_sum(values: impl IntoIterator<Item = Decimal>, what: &str) -> SolarFinanceResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| out_of_range(what))
}

fn payback_year(flows: &[Money]) -> SolarFinanceResult<Option<u32>> {
    let mut cumulative = Decimal::ZERO;
    for (year, cf) in flows.iter().enumerate() {
        cumulative = cumulative
            .checked_add(*cf)
            .ok_or_else(|| out_of_range("cumulative cash flow"))?;
        if cumulative >= Decimal::ZERO {
            return Ok(Some(year as u32));
        }
    }
    Ok(None)
}

/// Total net return over the investment base: the upfront outlay under CAPEX, the sum
/// of PPA payments under PPA.
fn roi(params: &ProjectParameters, projection: &Projection) -> SolarFinanceResult<Option<Rate>> {
    let base = match params.mode() {
        FinancingMode::Capex => projection.initial_cash_flow().abs(),
        FinancingMode::Ppa => checked_sum(
            projection.costs.iter().map(|c| c.cost_with_system),
            "total PPA payments",
        )?,
    };
    if base.is_zero() {
        return Ok(None);
    }
    let total = checked_sum(projection.cash_flows.iter().copied(), "total cash flow")?;
    total.checked_div(base).map(Some).ok_or_else(|| out_of_range("roi"))
}

fn lcoe(projection: &Projection, factors: &[Decimal]) -> SolarFinanceResult<Option<Money>> {
    let mut discounted_cost = projection.initial_cash_flow().abs();
    let mut discounted_energy = Decimal::ZERO;
    for ((energy, costs), factor) in projection
        .production
        .iter()
        .zip(&projection.costs)
        .zip(factors.iter().skip(1))
    {
        discounted_cost = costs
            .cost_with_system
            .checked_div(*factor)
            .and_then(|c| discounted_cost.checked_add(c))
            .ok_or_else(|| out_of_range("discounted lifetime cost"))?;
        discounted_energy = energy
            .checked_div(*factor)
            .and_then(|e| discounted_energy.checked_add(e))
            .ok_or_else(|| out_of_range("discounted lifetime energy"))?;
    }
    if discounted_energy.is_zero() {
        return Ok(None);
    }
    discounted_cost
        .checked_div(discounted_energy)
        .map(Some)
        .ok_or_else(|| out_of_range("lcoe"))
}
