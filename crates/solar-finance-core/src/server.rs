//! HTTP rendition of the remote computation service, backed by the embedded engine.

use std::net::SocketAddr;

use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, error, info};

use crate::engine::wire::{CalculateRequest, CalculateResponse, ErrorBody};
use crate::engine::EmbeddedEngine;
use crate::error::ErrorKind;
use crate::{SolarFinanceError, SolarFinanceResult};

/// Routes plus the CORS layer; preflight requests are answered by `cors`.
pub fn router(cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/calculate", post(calculate_handler))
        .layer(cors)
}

/// Browser access policy. An empty list, or one containing `*`, admits any origin.
pub fn cors_layer(allowed_origins: &[String]) -> SolarFinanceResult<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim()).map_err(|_| {
                SolarFinanceError::Configuration(format!("invalid CORS origin '{origin}'"))
            })
        })
        .collect::<SolarFinanceResult<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Bind `addr` and serve until the process stops.
pub async fn serve(addr: SocketAddr, allowed_origins: &[String]) -> SolarFinanceResult<()> {
    let app = router(cors_layer(allowed_origins)?);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| SolarFinanceError::Configuration(format!("cannot bind {addr}: {e}")))?;
    if allowed_origins.is_empty() {
        info!("CORS: any origin");
    } else {
        info!("CORS: {}", allowed_origins.join(", "));
    }
    serve_on(listener, app).await
}

pub async fn serve_on(listener: TcpListener, app: Router) -> SolarFinanceResult<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Financial engine listening on http://{}", addr);
    }
    axum::serve(listener, app)
        .await
        .map_err(|e| SolarFinanceError::Configuration(format!("server stopped: {e}")))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /calculate
async fn calculate_handler(body: String) -> Response {
    match calculate(&body) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) if e.kind() == ErrorKind::InvalidInput => {
            debug!("rejected /calculate payload: {}", e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody::validation(e.to_string())),
            )
                .into_response()
        }
        Err(e) => {
            error!("calculation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::internal(e.to_string())),
            )
                .into_response()
        }
    }
}

fn calculate(body: &str) -> SolarFinanceResult<CalculateResponse> {
    let mut payload: Value = serde_json::from_str(body)
        .map_err(|e| SolarFinanceError::invalid("body", format!("is not valid JSON: {e}")))?;
    strip_unset(&mut payload);

    let request: CalculateRequest = serde_json::from_value(payload)
        .map_err(|e| SolarFinanceError::invalid("body", e.to_string()))?;
    let result = EmbeddedEngine.calculate(&request.into_inputs()?)?;
    Ok(CalculateResponse::from_result(&result))
}

/// Drop top-level fields a form left unset (`null` or the string "undefined").
fn strip_unset(payload: &mut Value) {
    if let Value::Object(fields) = payload {
        fields.retain(|_, v| !(v.is_null() || v.as_str() == Some("undefined")));
    }
}
