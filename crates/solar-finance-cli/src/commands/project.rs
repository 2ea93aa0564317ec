use clap::Args;
use serde_json::{json, Value};

use solar_finance_core::project::normalize;
use solar_finance_core::projection::project;
use solar_finance_core::YearRecord;

use crate::input::{self, ProjectFlags};

/// Arguments for a year-by-year projection
#[derive(Args)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub project: ProjectFlags,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let project_inputs = input::read_project_inputs(&args.project)?;
    let normalized = normalize(&project_inputs)?;
    let projection = project(&normalized.params)?;

    Ok(json!({
        "projections": YearRecord::merge(&projection),
        "cash_flows": projection.cash_flows,
        "inputs": normalized.params,
        "audit": normalized.audit,
    }))
}
