use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use super::wire::{CalculateRequest, CalculateResponse, ErrorBody};
use super::{EngineOutput, FinancialBackend};
use crate::config::EngineConfig;
use crate::project::ProjectParameters;
use crate::types::EngineKind;
use crate::{SolarFinanceError, SolarFinanceResult};

const WARM_UP_STAGE: &str = "warm-up";
const CALCULATE_STAGE: &str = "calculate";

/// HTTP client for a remote computation service exposing `/health` and `/calculate`.
#[derive(Debug, Clone)]
pub struct RemoteEngine {
    base_url: String,
    client: Client,
    warm_up_timeout: Duration,
    timeout: Duration,
}

impl RemoteEngine {
    pub fn new(
        base_url: impl Into<String>,
        warm_up_timeout: Duration,
        timeout: Duration,
    ) -> SolarFinanceResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SolarFinanceError::Configuration(
                "remote engine URL is empty".into(),
            ));
        }
        let client = Client::builder().build().map_err(|e| {
            SolarFinanceError::Configuration(format!("failed to build HTTP client: {e}"))
        })?;

        info!("Remote financial engine at {}", base_url);
        Ok(Self {
            base_url,
            client,
            warm_up_timeout,
            timeout,
        })
    }

    /// `None` when the configuration selects the embedded engine.
    pub fn from_config(config: &EngineConfig) -> SolarFinanceResult<Option<Self>> {
        config
            .remote_url
            .as_deref()
            .map(|url| Self::new(url, config.warm_up_timeout(), config.timeout()))
            .transpose()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_calculate(&self, request: &CalculateRequest) -> SolarFinanceResult<String> {
        let url = format!("{}/calculate", self.base_url);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(CALCULATE_STAGE, self.timeout, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(CALCULATE_STAGE, self.timeout, e))?;

        if status.is_success() {
            return Ok(body);
        }

        let detail = serde_json::from_str::<ErrorBody>(&body).ok();
        Err(match (status, detail) {
            (StatusCode::UNPROCESSABLE_ENTITY, detail) => SolarFinanceError::InvalidParameter {
                field: "request".into(),
                reason: detail.map(|d| d.message).unwrap_or(body),
            },
            (StatusCode::INTERNAL_SERVER_ERROR, Some(detail))
                if detail.error == ErrorBody::INTERNAL =>
            {
                SolarFinanceError::Computation(format!("remote engine: {}", detail.message))
            }
            (status, _) => SolarFinanceError::RemoteProtocol(format!(
                "unexpected HTTP status {status} from /calculate"
            )),
        })
    }
}

#[async_trait]
impl FinancialBackend for RemoteEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Remote
    }

    async fn warm_up(&self) -> SolarFinanceResult<()> {
        let url = format!("{}/health", self.base_url);
        debug!("GET {}", url);

        let response = tokio::time::timeout(self.warm_up_timeout, self.client.get(&url).send())
            .await
            .map_err(|_| SolarFinanceError::RemoteTimeout {
                stage: WARM_UP_STAGE.into(),
                seconds: self.warm_up_timeout.as_secs(),
            })?
            .map_err(|e| transport_error(WARM_UP_STAGE, self.warm_up_timeout, e))?;

        if !response.status().is_success() {
            return Err(SolarFinanceError::RemoteProtocol(format!(
                "health check returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn compute(&self, params: &ProjectParameters) -> SolarFinanceResult<EngineOutput> {
        let request = CalculateRequest::from_params(params);

        let body = tokio::time::timeout(self.timeout, self.post_calculate(&request))
            .await
            .map_err(|_| SolarFinanceError::RemoteTimeout {
                stage: CALCULATE_STAGE.into(),
                seconds: self.timeout.as_secs(),
            })??;

        let response: CalculateResponse = serde_json::from_str(&body).map_err(|e| {
            SolarFinanceError::RemoteProtocol(format!("malformed /calculate body: {e}"))
        })?;
        debug!(
            years = response.projections.len(),
            "remote engine responded"
        );

        response.into_output(params.lifetime_years)
    }
}

fn transport_error(stage: &str, limit: Duration, err: reqwest::Error) -> SolarFinanceError {
    if err.is_timeout() {
        SolarFinanceError::RemoteTimeout {
            stage: stage.into(),
            seconds: limit.as_secs(),
        }
    } else if err.is_decode() || err.is_body() {
        SolarFinanceError::RemoteProtocol(err.to_string())
    } else {
        SolarFinanceError::RemoteConnectivity(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::FinancingTerms;
    use crate::types::Currency;
    use mockito::{Matcher, Server};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn params(lifetime_years: u32) -> ProjectParameters {
        ProjectParameters {
            capacity_kwp: dec!(10),
            performance_ratio: dec!(0.8),
            degradation_rate: dec!(0),
            reference_yield_kwh_per_kwp: dec!(1000),
            annual_opex: dec!(0),
            lifetime_years,
            discount_rate: dec!(0.10),
            om_inflation_rate: dec!(0),
            tariff_escalation_rate: dec!(0),
            baseline_annual_cost: dec!(50),
            financing: FinancingTerms::Capex { capex: dec!(100) },
            monthly_consumption_kwh: None,
            peak_demand_kw: None,
            currency: Currency::MXN,
        }
    }

    fn engine(url: String) -> RemoteEngine {
        RemoteEngine::new(url, Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_compute_translates_response() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/calculate")
            .match_body(Matcher::PartialJson(json!({ "modo": "CAPEX", "capex": 100.0 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "kpis": { "van": -13.2, "tir": null, "payback_simple": 2,
                              "payback_descontado": null, "roi": 0.0, "lcoe": 12.5 },
                    "projections": [
                        { "anio": 1, "energia_kwh": 8000.0, "costo_sin_sistema": 50.0,
                          "costo_con_sistema": 0.0, "ahorro": 50.0, "opex": 0.0, "flujo_neto": 50.0 },
                        { "anio": 2, "energia_kwh": 8000.0, "costo_sin_sistema": 50.0,
                          "costo_con_sistema": 0.0, "ahorro": 50.0, "opex": 0.0, "flujo_neto": 50.0 }
                    ],
                    "cashflow": [-100.0, 50.0, 50.0],
                    "audit": ["remote: defaults applied"]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let output = engine(server.url()).compute(&params(2)).await.unwrap();
        assert_eq!(output.kpis.payback_simple, Some(2));
        assert_eq!(output.kpis.npv, Some(dec!(-13.2)));
        assert_eq!(output.projections[1].year, 2);
        assert_eq!(output.audit, vec!["remote: defaults applied".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_validation_error_maps_to_invalid_parameter() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/calculate")
            .with_status(422)
            .with_body(json!({ "error": "ValidationError", "message": "kWp must be > 0" }).to_string())
            .create_async()
            .await;

        let err = engine(server.url()).compute(&params(2)).await.unwrap_err();
        match err {
            SolarFinanceError::InvalidParameter { reason, .. } => {
                assert_eq!(reason, "kWp must be > 0")
            }
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unexpected_status_is_protocol_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/calculate")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = engine(server.url()).compute(&params(2)).await.unwrap_err();
        assert!(matches!(err, SolarFinanceError::RemoteProtocol(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_protocol_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/calculate")
            .with_status(200)
            .with_body("<html>sleeping</html>")
            .create_async()
            .await;

        let err = engine(server.url()).compute(&params(2)).await.unwrap_err();
        assert!(matches!(err, SolarFinanceError::RemoteProtocol(_)));
    }

    #[tokio::test]
    async fn test_empty_kpis_is_protocol_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/calculate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "kpis": {},
                    "projections": [
                        { "anio": 1, "energia_kwh": 8000.0, "costo_sin_sistema": 50.0,
                          "costo_con_sistema": 0.0, "ahorro": 50.0, "opex": 0.0, "flujo_neto": 50.0 }
                    ],
                    "cashflow": [-100.0, 50.0]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = engine(server.url()).compute(&params(1)).await.unwrap_err();
        assert!(matches!(err, SolarFinanceError::RemoteProtocol(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_warm_up_hits_health() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        engine(server.url()).warm_up().await.unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn test_empty_url_rejected() {
        let err = RemoteEngine::new("", Duration::from_secs(1), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SolarFinanceError::Configuration(_)));
    }
}
