use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockito::Server;
use rust_decimal_macros::dec;
use serde_json::json;
use solar_finance_core::engine::EngineOutput;
use solar_finance_core::{
    EmbeddedEngine, EngineConfig, EngineKind, ErrorKind, FinancialBackend, Orchestrator,
    ProjectInputs, ProjectParameters, RemoteEngine, RunOutcome, RunState, SolarFinanceError,
    SolarFinanceResult,
};

fn inputs(lifetime_years: i64) -> ProjectInputs {
    ProjectInputs {
        capacity_kwp: Some(dec!(100)),
        capex: Some(dec!(1_200_000)),
        annual_opex: Some(dec!(15_000)),
        lifetime_years: Some(lifetime_years),
        ..Default::default()
    }
}

fn remote(url: String, warm_up: Duration, timeout: Duration, fallback: bool) -> Orchestrator {
    let engine = RemoteEngine::new(url, warm_up, timeout).unwrap();
    Orchestrator::with_backend(Arc::new(engine), fallback)
}

/// Address on which nothing is listening.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn one_year_response() -> String {
    json!({
        "kpis": { "van": 1000.0, "tir": 0.25, "payback_simple": 1,
                  "payback_descontado": 1, "roi": 0.1, "lcoe": 1.5 },
        "projections": [
            { "anio": 1, "energia_kwh": 164615.0, "costo_sin_sistema": 460922.0,
              "costo_con_sistema": 15000.0, "ahorro": 445922.0, "opex": 15000.0,
              "flujo_neto": 430922.0 }
        ],
        "cashflow": [-1200000.0, 430922.0],
        "audit": []
    })
    .to_string()
}

// ===========================================================================
// Remote failures
// ===========================================================================

#[tokio::test]
async fn test_unreachable_remote_is_connectivity_error() {
    let orchestrator = remote(
        closed_port_url(),
        Duration::from_secs(1),
        Duration::from_secs(5),
        false,
    );

    let err = orchestrator.run(&inputs(25)).await.unwrap_err();
    assert!(
        matches!(err, SolarFinanceError::RemoteConnectivity(_)),
        "expected connectivity error, got {err:?}"
    );
    assert_eq!(orchestrator.state(), RunState::Failed);
}

#[tokio::test]
async fn test_response_without_kpis_is_protocol_error() {
    let mut server = Server::new_async().await;
    let _health = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body(r#"{"status":"ok"}"#)
        .create_async()
        .await;
    let calculate = server
        .mock("POST", "/calculate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "projections": [], "cashflow": [] }).to_string())
        .create_async()
        .await;

    let orchestrator = remote(server.url(), Duration::from_secs(1), Duration::from_secs(5), false);
    let err = orchestrator.run(&inputs(1)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(orchestrator.state(), RunState::Failed);
    calculate.assert_async().await;
}

#[tokio::test]
async fn test_silent_remote_times_out() {
    // Accepted by the kernel backlog, never answered.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let orchestrator = remote(
        url,
        Duration::from_millis(100),
        Duration::from_millis(300),
        false,
    );
    let err = orchestrator.run(&inputs(25)).await.unwrap_err();

    match err {
        SolarFinanceError::RemoteTimeout { stage, .. } => assert_eq!(stage, "calculate"),
        other => panic!("expected RemoteTimeout, got {other:?}"),
    }
    drop(listener);
}

// ===========================================================================
// Remote success
// ===========================================================================

#[tokio::test]
async fn test_remote_result_is_canonical() {
    let mut server = Server::new_async().await;
    let health = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body(r#"{"status":"ok"}"#)
        .create_async()
        .await;
    let _calculate = server
        .mock("POST", "/calculate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(one_year_response())
        .create_async()
        .await;

    let orchestrator = remote(server.url(), Duration::from_secs(1), Duration::from_secs(5), false);
    let result = orchestrator
        .run(&inputs(1))
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(result.engine, EngineKind::Remote);
    assert_eq!(result.kpis.irr, Some(dec!(0.25)));
    assert_eq!(result.kpis.payback_simple, Some(1));
    assert_eq!(result.projections[0].opex, dec!(15000));
    assert_eq!(result.audit.last().unwrap(), "served by remote engine");
    assert_eq!(orchestrator.state(), RunState::Succeeded);
    health.assert_async().await;
}

#[tokio::test]
async fn test_warm_up_failure_is_only_audited() {
    let mut server = Server::new_async().await;
    let _health = server
        .mock("GET", "/health")
        .with_status(503)
        .create_async()
        .await;
    let _calculate = server
        .mock("POST", "/calculate")
        .with_status(200)
        .with_body(one_year_response())
        .create_async()
        .await;

    let orchestrator = remote(server.url(), Duration::from_secs(1), Duration::from_secs(5), false);
    let result = orchestrator
        .run(&inputs(1))
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert!(result
        .audit
        .iter()
        .any(|line| line.starts_with("remote warm-up failed")));
}

// ===========================================================================
// Fallback
// ===========================================================================

#[tokio::test]
async fn test_fallback_serves_embedded_result() {
    let orchestrator = remote(
        closed_port_url(),
        Duration::from_secs(1),
        Duration::from_secs(5),
        true,
    );

    let result = orchestrator
        .run(&inputs(25))
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(result.engine, EngineKind::Embedded);
    assert!(result.audit.iter().any(|line| line.contains("fell back to embedded")));
    assert_eq!(result.audit.last().unwrap(), "served by embedded engine");
}

#[tokio::test]
async fn test_invalid_input_never_falls_back() {
    let orchestrator = remote(
        closed_port_url(),
        Duration::from_secs(1),
        Duration::from_secs(5),
        true,
    );
    let mut raw = inputs(25);
    raw.lifetime_years = Some(0);

    let err = orchestrator.run(&raw).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_fallback_config_is_honoured() {
    let mut config = EngineConfig::remote(closed_port_url());
    config.fallback_to_embedded = true;
    config.warm_up_timeout_secs = 1;
    let orchestrator = Orchestrator::new(&config).unwrap();

    let outcome = orchestrator.run(&inputs(10)).await.unwrap();
    assert_eq!(outcome.into_result().unwrap().engine, EngineKind::Embedded);
}

// ===========================================================================
// Latest wins
// ===========================================================================

/// Embedded computation that stalls on its first call only.
struct StallOnce {
    stalled: AtomicBool,
    delay: Duration,
}

#[async_trait]
impl FinancialBackend for StallOnce {
    fn kind(&self) -> EngineKind {
        EngineKind::Embedded
    }

    async fn compute(&self, params: &ProjectParameters) -> SolarFinanceResult<EngineOutput> {
        if !self.stalled.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
        EmbeddedEngine.run(params)
    }
}

#[tokio::test]
async fn test_stale_run_is_superseded() {
    let orchestrator = Orchestrator::with_backend(
        Arc::new(StallOnce {
            stalled: AtomicBool::new(false),
            delay: Duration::from_millis(300),
        }),
        false,
    );

    let first_inputs = inputs(25);
    let second_inputs = inputs(10);
    let (first, second) = tokio::join!(orchestrator.run(&first_inputs), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        orchestrator.run(&second_inputs).await
    });

    assert_eq!(first.unwrap(), RunOutcome::Superseded { generation: 1 });
    let latest = second.unwrap().into_result().unwrap();
    assert_eq!(latest.projections.len(), 10);
    assert_eq!(orchestrator.state(), RunState::Succeeded);
}
