use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::{SolarFinanceError, SolarFinanceResult};

/// Raw, user- or bill-derived project figures. Every field is optional; the normalizer
/// fills gaps with documented defaults and rejects inconsistent combinations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInputs {
    /// Installed capacity (kWp). Sized from consumption when absent.
    pub capacity_kwp: Option<Decimal>,
    /// Average monthly consumption from the bill (kWh)
    pub monthly_consumption_kwh: Option<Energy>,
    /// Peak demand from the bill (kW)
    pub peak_demand_kw: Option<Decimal>,
    /// Average monthly bill amount (base currency)
    pub monthly_bill: Option<Money>,
    /// Grid energy price per kWh (base currency)
    pub grid_tariff: Option<Money>,
    /// Explicit year-1 electricity cost without the system; wins over bill figures
    pub baseline_annual_cost: Option<Money>,
    pub performance_ratio: Option<Rate>,
    pub degradation_rate: Option<Rate>,
    /// Annual full-load hours (kWh per kWp)
    pub reference_yield_kwh_per_kwp: Option<Decimal>,
    /// Year-1 operation and maintenance cost
    pub annual_opex: Option<Money>,
    /// Signed so that zero and negative lifetimes can be reported rather than wrapped
    pub lifetime_years: Option<i64>,
    pub discount_rate: Option<Rate>,
    pub om_inflation_rate: Option<Rate>,
    pub tariff_escalation_rate: Option<Rate>,
    /// "CAPEX" or "PPA"; inferred from the cost fields when absent
    pub mode: Option<String>,
    pub capex: Option<Money>,
    pub ppa_initial_price: Option<Money>,
    pub ppa_escalation_rate: Option<Rate>,
    pub currency: Option<String>,
}

/// Mode-specific cost terms. Exactly one set exists per project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "UPPERCASE")]
pub enum FinancingTerms {
    Capex {
        /// Upfront capital cost, paid at year 0
        capex: Money,
    },
    Ppa {
        /// Year-1 price per kWh
        initial_price: Money,
        escalation_rate: Rate,
    },
}

impl FinancingTerms {
    pub fn mode(&self) -> FinancingMode {
        match self {
            FinancingTerms::Capex { .. } => FinancingMode::Capex,
            FinancingTerms::Ppa { .. } => FinancingMode::Ppa,
        }
    }
}

/// Complete, validated parameter set for one computation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectParameters {
    pub capacity_kwp: Decimal,
    pub performance_ratio: Rate,
    pub degradation_rate: Rate,
    pub reference_yield_kwh_per_kwp: Decimal,
    pub annual_opex: Money,
    pub lifetime_years: u32,
    pub discount_rate: Rate,
    pub om_inflation_rate: Rate,
    pub tariff_escalation_rate: Rate,
    pub baseline_annual_cost: Money,
    pub financing: FinancingTerms,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_consumption_kwh: Option<Energy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_demand_kw: Option<Decimal>,
    pub currency: Currency,
}

impl ProjectParameters {
    pub fn mode(&self) -> FinancingMode {
        self.financing.mode()
    }

    /// Year-0 outlay. Zero under PPA.
    pub fn upfront_capex(&self) -> Money {
        match self.financing {
            FinancingTerms::Capex { capex } => capex,
            FinancingTerms::Ppa { .. } => Decimal::ZERO,
        }
    }

    /// Year-1 production before degradation.
    pub fn first_year_energy(&self) -> SolarFinanceResult<Energy> {
        self.capacity_kwp
            .checked_mul(self.performance_ratio)
            .and_then(|e| e.checked_mul(self.reference_yield_kwh_per_kwp))
            .ok_or_else(|| {
                SolarFinanceError::Computation(
                    "year-1 energy exceeds the representable range".into(),
                )
            })
    }
}
