use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Serialize;

use solar_finance_core::project::{normalize, ProjectInputs, ProjectParameters};
use solar_finance_core::projection::{project, Projection};
use solar_finance_core::{EmbeddedEngine, YearRecord};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_inputs(input_json: &str) -> NapiResult<ProjectInputs> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

#[derive(Serialize)]
struct ProjectionOutput {
    projections: Vec<YearRecord>,
    cash_flows: Vec<rust_decimal::Decimal>,
    inputs: ProjectParameters,
    audit: Vec<String>,
}

impl ProjectionOutput {
    fn new(inputs: ProjectParameters, projection: Projection, audit: Vec<String>) -> Self {
        Self {
            projections: YearRecord::merge(&projection),
            cash_flows: projection.cash_flows,
            inputs,
            audit,
        }
    }
}

/// Defaults filled and validated; returns `{ params, audit }`.
#[napi]
pub fn normalize_inputs(input_json: String) -> NapiResult<String> {
    let inputs = parse_inputs(&input_json)?;
    let normalized = normalize(&inputs).map_err(to_napi_error)?;
    serde_json::to_string(&normalized).map_err(to_napi_error)
}

#[napi]
pub fn project_cash_flows(input_json: String) -> NapiResult<String> {
    let inputs = parse_inputs(&input_json)?;
    let normalized = normalize(&inputs).map_err(to_napi_error)?;
    let projection = project(&normalized.params).map_err(to_napi_error)?;
    let output = ProjectionOutput::new(normalized.params, projection, normalized.audit);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_financials(input_json: String) -> NapiResult<String> {
    let inputs = parse_inputs(&input_json)?;
    let result = EmbeddedEngine
        .calculate(&inputs)
        .map_err(|e| to_napi_error(e.user_message()))?;
    serde_json::to_string(&result).map_err(to_napi_error)
}
