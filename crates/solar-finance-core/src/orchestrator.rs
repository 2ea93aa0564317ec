use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::{EmbeddedEngine, FinancialBackend, FinancialResult, RemoteEngine};
use crate::project::{normalize, ProjectInputs};
use crate::types::EngineKind;
use crate::SolarFinanceResult;

/// Where the latest run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    WarmingRemote,
    Invoking,
    Succeeded,
    Failed,
}

/// Result of one [`Orchestrator::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Box<FinancialResult>),
    /// A newer run started while this one was in flight; its value was discarded.
    Superseded { generation: u64 },
}

impl RunOutcome {
    pub fn into_result(self) -> Option<FinancialResult> {
        match self {
            RunOutcome::Completed(result) => Some(*result),
            RunOutcome::Superseded { .. } => None,
        }
    }
}

/// Runs computations on the configured backend. When several runs overlap, only the
/// most recently started one delivers a value.
pub struct Orchestrator {
    backend: Arc<dyn FinancialBackend>,
    fallback_to_embedded: bool,
    generation: AtomicU64,
    state: Mutex<RunState>,
}

impl Orchestrator {
    /// Remote backend iff the configuration names a URL, embedded otherwise.
    pub fn new(config: &EngineConfig) -> SolarFinanceResult<Self> {
        config.validate()?;
        let backend: Arc<dyn FinancialBackend> = match RemoteEngine::from_config(config)? {
            Some(remote) => Arc::new(remote),
            None => Arc::new(EmbeddedEngine),
        };
        Ok(Self::with_backend(backend, config.fallback_to_embedded))
    }

    pub fn with_backend(backend: Arc<dyn FinancialBackend>, fallback_to_embedded: bool) -> Self {
        info!("Financial engine: {}", backend.kind());
        Self {
            backend,
            fallback_to_embedded,
            generation: AtomicU64::new(0),
            state: Mutex::new(RunState::Idle),
        }
    }

    pub fn engine(&self) -> EngineKind {
        self.backend.kind()
    }

    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Normalize `inputs`, compute on the selected backend and return the canonical
    /// result. Warm-up failures are recorded in the audit and otherwise ignored.
    pub async fn run(&self, inputs: &ProjectInputs) -> SolarFinanceResult<RunOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let kind = self.backend.kind();
        info!(generation, engine = %kind, "financial run started");
        self.transition(generation, RunState::Idle);

        let result = self.execute(generation, kind, inputs).await;

        if !self.is_latest(generation) {
            warn!(generation, "discarding result of superseded run");
            return Ok(RunOutcome::Superseded { generation });
        }

        match result {
            Ok(result) => {
                self.transition(generation, RunState::Succeeded);
                info!(generation, engine = %result.engine, "financial run succeeded");
                Ok(RunOutcome::Completed(Box::new(result)))
            }
            Err(e) => {
                self.transition(generation, RunState::Failed);
                warn!(generation, kind = ?e.kind(), "financial run failed: {}", e);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        generation: u64,
        kind: EngineKind,
        inputs: &ProjectInputs,
    ) -> SolarFinanceResult<FinancialResult> {
        let normalized = normalize(inputs)?;
        let params = normalized.params;
        let mut audit = normalized.audit;
        debug!(generation, lifetime = params.lifetime_years, mode = %params.mode(), "inputs normalized");

        if kind == EngineKind::Remote {
            self.transition(generation, RunState::WarmingRemote);
            if let Err(e) = self.backend.warm_up().await {
                warn!("remote warm-up failed, continuing: {}", e);
                audit.push(format!("remote warm-up failed: {e}"));
            }
        }

        self.transition(generation, RunState::Invoking);
        match self.backend.compute(&params).await {
            Ok(output) => Ok(FinancialResult::assemble(params, output, audit, kind)),
            Err(e) if self.fallback_to_embedded && kind == EngineKind::Remote && e.is_remote_failure() => {
                warn!("remote engine failed, falling back to embedded: {}", e);
                audit.push(format!("remote engine failed ({e}); fell back to embedded engine"));
                let output = EmbeddedEngine.run(&params)?;
                Ok(FinancialResult::assemble(
                    params,
                    output,
                    audit,
                    EngineKind::Embedded,
                ))
            }
            Err(e) => Err(e),
        }
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Only the latest run drives the observable state.
    fn transition(&self, generation: u64, next: RunState) {
        let mut state = self.state.lock();
        if self.is_latest(generation) {
            let previous = *state;
            debug!(generation, from = ?previous, to = ?next, "run state");
            *state = next;
        }
    }
}
