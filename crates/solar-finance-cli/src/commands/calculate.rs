use clap::Args;
use serde_json::Value;

use solar_finance_core::{EngineConfig, Orchestrator, RunOutcome};

use crate::input::{self, ProjectFlags};

/// Arguments for a full financial run
#[derive(Args)]
pub struct CalculateArgs {
    #[command(flatten)]
    pub project: ProjectFlags,

    /// TOML engine configuration file (flags and environment override it)
    #[arg(long)]
    pub engine_config: Option<String>,

    /// Base URL of a remote engine; the embedded engine is used when unset
    #[arg(long, env = "SOLAR_FINANCE_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Bound on the remote /calculate call, seconds
    #[arg(long, env = "SOLAR_FINANCE_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Bound on the remote /health warm-up, seconds
    #[arg(long, env = "SOLAR_FINANCE_WARMUP_TIMEOUT_SECS")]
    pub warm_up_timeout_secs: Option<u64>,

    /// Re-run on the embedded engine when the remote engine fails
    #[arg(long, env = "SOLAR_FINANCE_FALLBACK")]
    pub fallback: bool,
}

impl CalculateArgs {
    fn engine_config(&self) -> Result<EngineConfig, Box<dyn std::error::Error>> {
        let mut config = match self.engine_config {
            Some(ref path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if let Some(ref url) = self.remote_url {
            if !url.trim().is_empty() {
                config.remote_url = Some(url.trim().to_string());
            }
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        if let Some(secs) = self.warm_up_timeout_secs {
            config.warm_up_timeout_secs = secs;
        }
        if self.fallback {
            config.fallback_to_embedded = true;
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn run_calculate(args: CalculateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let project_inputs = input::read_project_inputs(&args.project)?;
    let config = args.engine_config()?;
    let orchestrator = Orchestrator::new(&config)?;

    let outcome = super::runtime()?.block_on(orchestrator.run(&project_inputs));
    let result = match outcome {
        Ok(RunOutcome::Completed(result)) => result,
        Ok(RunOutcome::Superseded { generation }) => {
            return Err(format!("run {generation} was superseded").into())
        }
        Err(e) => return Err(e.user_message().into()),
    };

    Ok(serde_json::to_value(result)?)
}
