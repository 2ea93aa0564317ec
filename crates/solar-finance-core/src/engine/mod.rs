pub mod embedded;
pub mod remote;
pub mod wire;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::kpi::Kpis;
use crate::project::ProjectParameters;
use crate::projection::Projection;
use crate::types::*;
use crate::SolarFinanceResult;

pub use embedded::EmbeddedEngine;
pub use remote::RemoteEngine;

/// A backend able to turn validated parameters into projections and KPIs.
#[async_trait]
pub trait FinancialBackend: Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Best-effort preparation before the first `compute` (e.g. waking a cold remote
    /// host). Callers treat failures as non-fatal.
    async fn warm_up(&self) -> SolarFinanceResult<()> {
        Ok(())
    }

    async fn compute(&self, params: &ProjectParameters) -> SolarFinanceResult<EngineOutput>;
}

/// Combined production and cost figures for one project year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRecord {
    pub year: u32,
    pub energy_kwh: Energy,
    pub cost_without_system: Money,
    pub cost_with_system: Money,
    pub savings: Money,
    pub opex: Money,
    pub net_cash_flow: Money,
}

impl YearRecord {
    /// Zip per-year production with per-year costs.
    pub fn merge(projection: &Projection) -> Vec<YearRecord> {
        projection
            .production
            .iter()
            .zip(&projection.costs)
            .map(|(energy, costs)| YearRecord {
                year: costs.year,
                energy_kwh: *energy,
                cost_without_system: costs.cost_without_system,
                cost_with_system: costs.cost_with_system,
                savings: costs.savings,
                opex: costs.opex,
                net_cash_flow: costs.net_cash_flow,
            })
            .collect()
    }
}

/// What a backend hands back for one run, before provenance is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOutput {
    pub kpis: Kpis,
    pub projections: Vec<YearRecord>,
    pub cash_flows: Vec<Money>,
    pub audit: Vec<String>,
}

/// Canonical result of one run, independent of which backend served it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialResult {
    pub kpis: Kpis,
    pub projections: Vec<YearRecord>,
    /// Year 0 first, `lifetime + 1` entries
    pub cash_flows: Vec<Money>,
    /// Normalized parameters the run was computed from
    pub inputs: ProjectParameters,
    pub audit: Vec<String>,
    pub engine: EngineKind,
}

impl FinancialResult {
    /// Attach provenance to a backend output. `audit` holds the lines gathered before
    /// the backend ran (normalization, warm-up, fallback).
    pub fn assemble(
        inputs: ProjectParameters,
        output: EngineOutput,
        mut audit: Vec<String>,
        engine: EngineKind,
    ) -> Self {
        audit.extend(output.audit);
        if inputs.mode() == FinancingMode::Ppa {
            audit.push("opex reported as zero: O&M is included in the PPA price".to_string());
        }
        audit.push(format!("served by {engine} engine"));

        FinancialResult {
            kpis: output.kpis,
            projections: output.projections,
            cash_flows: output.cash_flows,
            inputs,
            audit,
            engine,
        }
    }
}
