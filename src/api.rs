//! HTTP API: health probe, prediction endpoint and metrics snapshot

use crate::error::PredictionError;
use crate::metrics::MetricsSnapshot;
use crate::service::PredictionService;
use crate::types::score::{HealthStatus, ScoreResult};
use crate::types::transaction::PredictRequest;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

/// Build the API router over a shared prediction service
pub fn router(service: Arc<PredictionService>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/predict", post(predict))
        .route("/metrics", get(metrics))
        .with_state(service)
}

/// Error returned to HTTP clients
#[derive(Debug)]
pub enum ApiError {
    /// Body is not a `{"features": {...}}` JSON object
    MalformedBody(JsonRejection),
    Prediction(PredictionError),
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        ApiError::Prediction(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MalformedBody(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Prediction(err) if err.is_client_error() => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            ApiError::Prediction(err) => {
                error!(error = %err, "Scoring failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Scoring failed".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

async fn health(State(service): State<Arc<PredictionService>>) -> Json<HealthStatus> {
    Json(service.health())
}

#[tracing::instrument(skip(service, payload), fields(request_id = %uuid::Uuid::new_v4()))]
async fn predict(
    State(service): State<Arc<PredictionService>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<ScoreResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Malformed predict body");
        service.metrics().record_rejection();
        rejection
    })?;

    match service.predict(&request) {
        Ok(result) => Ok(Json(result)),
        Err(err) => {
            if err.is_client_error() {
                warn!(error = %err, "Rejected predict request");
            }
            Err(err.into())
        }
    }
}

async fn metrics(State(service): State<Arc<PredictionService>>) -> Json<MetricsSnapshot> {
    Json(service.metrics().snapshot())
}
