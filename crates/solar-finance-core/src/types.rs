use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// All monetary values, always in the base currency. Wraps Decimal to prevent
/// accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.07 = 7%). Never as percentages.
pub type Rate = Decimal;

/// Energy in kWh.
pub type Energy = Decimal;

/// Currency code. Only used for labeling at the boundary; the engine always computes
/// in the base currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    MXN,
    USD,
    EUR,
    Other(String),
}

impl Currency {
    pub fn code(&self) -> &str {
        match self {
            Currency::MXN => "MXN",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "MXN" => Currency::MXN,
            "USD" => Currency::USD,
            "EUR" => Currency::EUR,
            other => Currency::Other(other.to_string()),
        }
    }
}

/// How the customer pays for the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FinancingMode {
    /// Customer owns the system through an upfront capital expenditure.
    Capex,
    /// Customer buys the produced energy at a contracted, escalating unit price.
    Ppa,
}

impl FinancingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinancingMode::Capex => "CAPEX",
            FinancingMode::Ppa => "PPA",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CAPEX" => Some(FinancingMode::Capex),
            "PPA" => Some(FinancingMode::Ppa),
            _ => None,
        }
    }
}

impl fmt::Display for FinancingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which computation backend produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Embedded,
    Remote,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Embedded => f.write_str("embedded"),
            EngineKind::Remote => f.write_str("remote"),
        }
    }
}
