use clap::Args;
use serde_json::{json, Value};

use solar_finance_core::project::normalize;

use crate::input::{self, ProjectFlags};

/// Arguments for input normalization
#[derive(Args)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub project: ProjectFlags,
}

pub fn run_normalize(args: NormalizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let project_inputs = input::read_project_inputs(&args.project)?;
    let normalized = normalize(&project_inputs)?;

    Ok(json!({
        "inputs": normalized.params,
        "audit": normalized.audit,
    }))
}
