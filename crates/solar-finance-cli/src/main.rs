mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::calculate::CalculateArgs;
use commands::normalize::NormalizeArgs;
use commands::project::ProjectArgs;
use commands::serve::ServeArgs;

/// Solar project financial projections and investment KPIs
#[derive(Parser)]
#[command(
    name = "solarfin",
    version,
    about = "Solar project financial projections and investment KPIs",
    long_about = "Estimate the economics of a solar installation from bill figures and \
                  project assumptions: year-by-year energy, costs and cash flows plus \
                  NPV, IRR, paybacks, ROI and LCOE, computed in-process or on a remote \
                  engine."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Full run: normalize, project and compute KPIs on the configured engine
    Calculate(CalculateArgs),
    /// Fill defaults and validate project inputs without computing
    Normalize(NormalizeArgs),
    /// Year-by-year projection without KPIs (embedded engine)
    Project(ProjectArgs),
    /// Serve the remote engine API (/health, /calculate) over HTTP
    Serve(ServeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing() {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Calculate(args) => commands::calculate::run_calculate(args),
        Commands::Normalize(args) => commands::normalize::run_normalize(args),
        Commands::Project(args) => commands::project::run_project(args),
        Commands::Serve(args) => {
            if let Err(e) = commands::serve::run_serve(args) {
                eprintln!("{}: {}", "error".red().bold(), e);
                process::exit(1);
            }
            return;
        }
        Commands::Version => {
            println!("solarfin {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
