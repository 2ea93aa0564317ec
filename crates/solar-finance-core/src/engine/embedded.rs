use async_trait::async_trait;
use tracing::debug;

use super::{EngineOutput, FinancialBackend, FinancialResult, YearRecord};
use crate::kpi::aggregate;
use crate::project::{normalize, ProjectInputs, ProjectParameters};
use crate::projection::project;
use crate::types::EngineKind;
use crate::SolarFinanceResult;

/// In-process backend: projection followed by KPI aggregation, no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedEngine;

impl EmbeddedEngine {
    pub fn run(&self, params: &ProjectParameters) -> SolarFinanceResult<EngineOutput> {
        let projection = project(params)?;
        debug!(years = projection.lifetime(), "projection complete");

        let report = aggregate(params, &projection)?;
        debug!(notes = report.notes.len(), "kpi aggregation complete");

        Ok(EngineOutput {
            kpis: report.kpis,
            projections: YearRecord::merge(&projection),
            cash_flows: projection.cash_flows,
            audit: report.notes,
        })
    }

    /// Normalize raw inputs and run them to a canonical result.
    pub fn calculate(&self, inputs: &ProjectInputs) -> SolarFinanceResult<FinancialResult> {
        let normalized = normalize(inputs)?;
        let output = self.run(&normalized.params)?;
        Ok(FinancialResult::assemble(
            normalized.params,
            output,
            normalized.audit,
            EngineKind::Embedded,
        ))
    }
}

#[async_trait]
impl FinancialBackend for EmbeddedEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Embedded
    }

    async fn compute(&self, params: &ProjectParameters) -> SolarFinanceResult<EngineOutput> {
        self.run(params)
    }
}
