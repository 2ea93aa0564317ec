//! JSON schema of the remote `/calculate` endpoint.
//!
//! The remote service speaks plain JSON numbers and Spanish field names. Everything is
//! converted field by field at this boundary; nothing outside this module sees `f64`.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::{EngineOutput, FinancialResult, YearRecord};
use crate::kpi::Kpis;
use crate::project::{FinancingTerms, ProjectInputs, ProjectParameters};
use crate::{SolarFinanceError, SolarFinanceResult};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// `POST /calculate` body. The client always fills every field relevant to the mode;
/// the server accepts any subset and applies defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculateRequest {
    #[serde(rename = "kWp", skip_serializing_if = "Option::is_none")]
    pub kwp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degradacion: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opex_anual: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vida_util: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasa_descuento: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inflacion_om: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalamiento_tarifa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capex: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppa_precio_inicial: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppa_escalamiento: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moneda: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumo_mensual_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demanda_pico_kw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub costo_base_anual: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendimiento_referencia: Option<f64>,
}

impl CalculateRequest {
    /// Payload for a fully normalized parameter set. Fields of the other financing
    /// mode are left out.
    pub fn from_params(params: &ProjectParameters) -> Self {
        let (capex, ppa_precio_inicial, ppa_escalamiento) = match params.financing {
            FinancingTerms::Capex { capex } => (Some(to_f64(capex)), None, None),
            FinancingTerms::Ppa {
                initial_price,
                escalation_rate,
            } => (
                None,
                Some(to_f64(initial_price)),
                Some(to_f64(escalation_rate)),
            ),
        };

        CalculateRequest {
            kwp: Some(to_f64(params.capacity_kwp)),
            pr: Some(to_f64(params.performance_ratio)),
            degradacion: Some(to_f64(params.degradation_rate)),
            opex_anual: Some(to_f64(params.annual_opex)),
            vida_util: Some(i64::from(params.lifetime_years)),
            tasa_descuento: Some(to_f64(params.discount_rate)),
            inflacion_om: Some(to_f64(params.om_inflation_rate)),
            escalamiento_tarifa: Some(to_f64(params.tariff_escalation_rate)),
            modo: Some(params.mode().as_str().to_string()),
            capex,
            ppa_precio_inicial,
            ppa_escalamiento,
            moneda: Some(params.currency.code().to_string()),
            consumo_mensual_kwh: params.monthly_consumption_kwh.map(to_f64),
            demanda_pico_kw: params.peak_demand_kw.map(to_f64),
            costo_base_anual: Some(to_f64(params.baseline_annual_cost)),
            rendimiento_referencia: Some(to_f64(params.reference_yield_kwh_per_kwp)),
        }
    }

    /// Raw inputs for the normalizer. Non-finite numbers are rejected per field.
    pub fn into_inputs(self) -> SolarFinanceResult<ProjectInputs> {
        let input = |field: &str, value: Option<f64>| -> SolarFinanceResult<Option<Decimal>> {
            value
                .map(|v| {
                    Decimal::from_f64(v)
                        .ok_or_else(|| SolarFinanceError::invalid(field, "must be a finite number"))
                })
                .transpose()
        };

        Ok(ProjectInputs {
            capacity_kwp: input("kWp", self.kwp)?,
            monthly_consumption_kwh: input("consumo_mensual_kwh", self.consumo_mensual_kwh)?,
            peak_demand_kw: input("demanda_pico_kw", self.demanda_pico_kw)?,
            monthly_bill: None,
            grid_tariff: None,
            baseline_annual_cost: input("costo_base_anual", self.costo_base_anual)?,
            performance_ratio: input("pr", self.pr)?,
            degradation_rate: input("degradacion", self.degradacion)?,
            reference_yield_kwh_per_kwp: input(
                "rendimiento_referencia",
                self.rendimiento_referencia,
            )?,
            annual_opex: input("opex_anual", self.opex_anual)?,
            lifetime_years: self.vida_util,
            discount_rate: input("tasa_descuento", self.tasa_descuento)?,
            om_inflation_rate: input("inflacion_om", self.inflacion_om)?,
            tariff_escalation_rate: input("escalamiento_tarifa", self.escalamiento_tarifa)?,
            mode: self.modo,
            capex: input("capex", self.capex)?,
            ppa_initial_price: input("ppa_precio_inicial", self.ppa_precio_inicial)?,
            ppa_escalation_rate: input("ppa_escalamiento", self.ppa_escalamiento)?,
            currency: self.moneda,
        })
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Every key is required; an explicit `null` marks the KPI as undefined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireKpis {
    #[serde(deserialize_with = "required_nullable")]
    pub van: Option<f64>,
    #[serde(deserialize_with = "required_nullable")]
    pub tir: Option<f64>,
    #[serde(deserialize_with = "required_nullable")]
    pub payback_simple: Option<f64>,
    #[serde(deserialize_with = "required_nullable")]
    pub payback_descontado: Option<f64>,
    #[serde(deserialize_with = "required_nullable")]
    pub roi: Option<f64>,
    #[serde(deserialize_with = "required_nullable")]
    pub lcoe: Option<f64>,
}

/// With `deserialize_with` and no `default`, serde reports a missing key instead of
/// reading it as `None`.
fn required_nullable<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Option::<f64>::deserialize(deserializer)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireYear {
    pub anio: u32,
    pub energia_kwh: f64,
    pub costo_sin_sistema: f64,
    pub costo_con_sistema: f64,
    pub ahorro: f64,
    pub opex: f64,
    pub flujo_neto: f64,
}

/// `POST /calculate` success body. `kpis` is optional here only so that its absence
/// can be reported as a protocol violation instead of a decode error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculateResponse {
    pub kpis: Option<WireKpis>,
    pub projections: Vec<WireYear>,
    pub cashflow: Vec<f64>,
    pub normalized_inputs: Option<CalculateRequest>,
    pub audit: Vec<String>,
}

/// Body of 422 and 500 responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub const VALIDATION: &'static str = "ValidationError";
    pub const INTERNAL: &'static str = "InternalError";

    pub fn validation(message: impl Into<String>) -> Self {
        ErrorBody {
            error: Self::VALIDATION.to_string(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ErrorBody {
            error: Self::INTERNAL.to_string(),
            message: message.into(),
        }
    }
}

impl CalculateResponse {
    pub fn from_result(result: &FinancialResult) -> Self {
        let kpis = &result.kpis;
        CalculateResponse {
            kpis: Some(WireKpis {
                van: kpis.npv.map(to_f64),
                tir: kpis.irr.map(to_f64),
                payback_simple: kpis.payback_simple.map(f64::from),
                payback_descontado: kpis.payback_discounted.map(f64::from),
                roi: kpis.roi.map(to_f64),
                lcoe: kpis.lcoe.map(to_f64),
            }),
            projections: result
                .projections
                .iter()
                .map(|y| WireYear {
                    anio: y.year,
                    energia_kwh: to_f64(y.energy_kwh),
                    costo_sin_sistema: to_f64(y.cost_without_system),
                    costo_con_sistema: to_f64(y.cost_with_system),
                    ahorro: to_f64(y.savings),
                    opex: to_f64(y.opex),
                    flujo_neto: to_f64(y.net_cash_flow),
                })
                .collect(),
            cashflow: result.cash_flows.iter().copied().map(to_f64).collect(),
            normalized_inputs: Some(CalculateRequest::from_params(&result.inputs)),
            audit: result.audit.clone(),
        }
    }

    /// Translate into canonical form, checking shape against the requested lifetime.
    pub fn into_output(self, lifetime_years: u32) -> SolarFinanceResult<EngineOutput> {
        let kpis = self
            .kpis
            .ok_or_else(|| SolarFinanceError::RemoteProtocol("response has no kpis".into()))?;

        let lifetime = lifetime_years as usize;
        if self.projections.len() != lifetime {
            return Err(SolarFinanceError::RemoteProtocol(format!(
                "expected {lifetime} projection years, got {}",
                self.projections.len()
            )));
        }
        if self.cashflow.len() != lifetime + 1 {
            return Err(SolarFinanceError::RemoteProtocol(format!(
                "expected {} cash flows, got {}",
                lifetime + 1,
                self.cashflow.len()
            )));
        }

        let kpis = Kpis {
            npv: kpis.van.map(|v| from_f64("kpis.van", v)).transpose()?,
            irr: kpis.tir.map(|v| from_f64("kpis.tir", v)).transpose()?,
            payback_simple: kpis
                .payback_simple
                .map(|v| payback_year("kpis.payback_simple", v))
                .transpose()?,
            payback_discounted: kpis
                .payback_descontado
                .map(|v| payback_year("kpis.payback_descontado", v))
                .transpose()?,
            roi: kpis.roi.map(|v| from_f64("kpis.roi", v)).transpose()?,
            lcoe: kpis.lcoe.map(|v| from_f64("kpis.lcoe", v)).transpose()?,
        };

        let projections = self
            .projections
            .into_iter()
            .map(|y| {
                Ok(YearRecord {
                    year: y.anio,
                    energy_kwh: from_f64("energia_kwh", y.energia_kwh)?,
                    cost_without_system: from_f64("costo_sin_sistema", y.costo_sin_sistema)?,
                    cost_with_system: from_f64("costo_con_sistema", y.costo_con_sistema)?,
                    savings: from_f64("ahorro", y.ahorro)?,
                    opex: from_f64("opex", y.opex)?,
                    net_cash_flow: from_f64("flujo_neto", y.flujo_neto)?,
                })
            })
            .collect::<SolarFinanceResult<Vec<_>>>()?;

        let cash_flows = self
            .cashflow
            .into_iter()
            .map(|v| from_f64("cashflow", v))
            .collect::<SolarFinanceResult<Vec<_>>>()?;

        Ok(EngineOutput {
            kpis,
            projections,
            cash_flows,
            audit: self.audit,
        })
    }
}

// ---------------------------------------------------------------------------
// Number conversion
// ---------------------------------------------------------------------------

/// Decimal values produced by the engine always fit an f64, at reduced precision.
fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn from_f64(field: &str, value: f64) -> SolarFinanceResult<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| {
        SolarFinanceError::RemoteProtocol(format!("{field} is not a representable number"))
    })
}

fn payback_year(field: &str, value: f64) -> SolarFinanceResult<u32> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(SolarFinanceError::RemoteProtocol(format!(
            "{field} must be a whole number of years, got {value}"
        )));
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Currency;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn ppa_params() -> ProjectParameters {
        ProjectParameters {
            capacity_kwp: dec!(100),
            performance_ratio: dec!(0.82),
            degradation_rate: dec!(0.007),
            reference_yield_kwh_per_kwp: dec!(2007.5),
            annual_opex: dec!(0),
            lifetime_years: 2,
            discount_rate: dec!(0.10),
            om_inflation_rate: dec!(0.03),
            tariff_escalation_rate: dec!(0.07),
            baseline_annual_cost: dec!(500_000),
            financing: FinancingTerms::Ppa {
                initial_price: dec!(2.2),
                escalation_rate: dec!(0.02),
            },
            monthly_consumption_kwh: None,
            peak_demand_kw: None,
            currency: Currency::MXN,
        }
    }

    #[test]
    fn test_request_uses_remote_names_and_omits_other_mode() {
        let body = serde_json::to_value(CalculateRequest::from_params(&ppa_params())).unwrap();
        assert_eq!(body["kWp"], json!(100.0));
        assert_eq!(body["modo"], json!("PPA"));
        assert_eq!(body["ppa_precio_inicial"], json!(2.2));
        assert_eq!(body["vida_util"], json!(2));
        assert!(body.get("capex").is_none());
        assert!(body.get("consumo_mensual_kwh").is_none());
    }

    #[test]
    fn test_missing_kpis_is_protocol_error() {
        let response: CalculateResponse =
            serde_json::from_value(json!({ "projections": [], "cashflow": [0.0] })).unwrap();
        let err = response.into_output(0).unwrap_err();
        assert!(matches!(err, SolarFinanceError::RemoteProtocol(_)));
    }

    #[test]
    fn test_null_kpis_stay_absent() {
        let response: CalculateResponse = serde_json::from_value(json!({
            "kpis": { "van": -10.5, "tir": null, "payback_simple": null,
                      "payback_descontado": null, "roi": -0.1, "lcoe": 3.2 },
            "projections": [{ "anio": 1, "energia_kwh": 1000.0, "costo_sin_sistema": 10.0,
                              "costo_con_sistema": 0.0, "ahorro": 10.0, "opex": 0.0,
                              "flujo_neto": 10.0 }],
            "cashflow": [-100.0, 10.0]
        }))
        .unwrap();
        let output = response.into_output(1).unwrap();
        assert_eq!(output.kpis.npv, Some(dec!(-10.5)));
        assert_eq!(output.kpis.irr, None);
        assert_eq!(output.kpis.payback_simple, None);
        assert_eq!(output.cash_flows, vec![dec!(-100), dec!(10)]);
    }

    #[test]
    fn test_empty_kpis_object_rejected() {
        let decoded = serde_json::from_value::<CalculateResponse>(json!({
            "kpis": {},
            "projections": [],
            "cashflow": [0.0]
        }));
        let err = decoded.unwrap_err().to_string();
        assert!(err.contains("missing field"), "got {err}");
    }

    #[test]
    fn test_kpi_key_missing_is_not_read_as_absent() {
        let decoded = serde_json::from_value::<CalculateResponse>(json!({
            "kpis": { "tir": 0.12, "payback_simple": 6.0, "payback_descontado": 9.0,
                      "roi": 1.5, "lcoe": 1.1 },
            "projections": [],
            "cashflow": [0.0]
        }));
        let err = decoded.unwrap_err().to_string();
        assert!(err.contains("van"), "got {err}");
    }

    #[test]
    fn test_fractional_payback_rejected() {
        assert!(payback_year("kpis.payback_simple", 3.5).is_err());
        assert_eq!(payback_year("kpis.payback_simple", 4.0).unwrap(), 4);
    }

    #[test]
    fn test_cashflow_length_checked() {
        let response = CalculateResponse {
            kpis: Some(WireKpis::default()),
            cashflow: vec![0.0],
            ..Default::default()
        };
        assert!(matches!(
            response.into_output(1),
            Err(SolarFinanceError::RemoteProtocol(_))
        ));
    }

    #[test]
    fn test_request_round_trips_into_inputs() {
        let inputs = CalculateRequest::from_params(&ppa_params())
            .into_inputs()
            .unwrap();
        assert_eq!(inputs.capacity_kwp, Some(dec!(100)));
        assert_eq!(inputs.mode.as_deref(), Some("PPA"));
        assert_eq!(inputs.capex, None);
        assert_eq!(inputs.ppa_initial_price, Some(dec!(2.2)));
    }
}
