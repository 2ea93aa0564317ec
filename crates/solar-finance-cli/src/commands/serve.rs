use clap::Args;
use std::net::SocketAddr;

use solar_finance_core::server;

/// Arguments for the HTTP engine
#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "SOLAR_FINANCE_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Origin allowed to call the API from a browser; repeat or comma-separate.
    /// Any origin is allowed when none is given.
    #[arg(
        long = "allow-origin",
        env = "SOLAR_FINANCE_ALLOWED_ORIGINS",
        value_delimiter = ','
    )]
    pub allowed_origins: Vec<String>,
}

pub fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    super::runtime()?.block_on(server::serve(args.bind, &args.allowed_origins))?;
    Ok(())
}
