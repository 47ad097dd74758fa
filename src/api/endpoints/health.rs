//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::inference::ActiveOperation;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub inference_busy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_operation: Option<ActiveOperation>,
}

/// `GET /health`: liveness plus inference gate status.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let current_operation = ctx.core.current_inference();
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        inference_busy: current_operation.is_some() || ctx.core.inference_busy(),
        current_operation,
    })
}
