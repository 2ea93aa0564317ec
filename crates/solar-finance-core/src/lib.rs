pub mod config;
pub mod engine;
pub mod error;
pub mod kpi;
pub mod orchestrator;
pub mod project;
pub mod projection;
pub mod time_value;
pub mod types;

#[cfg(feature = "server")]
pub mod server;

pub use config::EngineConfig;
pub use engine::{EmbeddedEngine, FinancialBackend, FinancialResult, RemoteEngine, YearRecord};
pub use error::{ErrorKind, SolarFinanceError};
pub use kpi::Kpis;
pub use orchestrator::{Orchestrator, RunOutcome, RunState};
pub use project::{normalize, ProjectInputs, ProjectParameters};
pub use types::*;

/// Standard result type for all solar-finance operations
pub type SolarFinanceResult<T> = Result<T, SolarFinanceError>;
