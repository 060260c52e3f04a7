//! Prediction service: feature engineering → assembly → scoring

use crate::error::{PredictionError, ValidationError};
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::ScoringMetrics;
use crate::models::inference::InferenceEngine;
use crate::models::loader::Artifacts;
use crate::models::schema::{FeatureSchema, MissingFeatureFill};
use crate::types::score::{HealthStatus, ScoreResult};
use crate::types::transaction::{PredictRequest, RawTransaction, TransactionInput};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Scores raw transaction payloads against the loaded artifacts.
///
/// Shared read-only across request handlers; every call is independent.
pub struct PredictionService {
    extractor: FeatureExtractor,
    schema: FeatureSchema,
    engine: InferenceEngine,
    missing_fill: MissingFeatureFill,
    metrics: Arc<ScoringMetrics>,
}

impl PredictionService {
    pub fn new(
        artifacts: Artifacts,
        threshold: f64,
        missing_fill: MissingFeatureFill,
        metrics: Arc<ScoringMetrics>,
    ) -> Self {
        metrics.set_amount_q95_fallback(artifacts.amount_q95.fallback);

        Self {
            extractor: FeatureExtractor::new(artifacts.amount_q95.value),
            schema: artifacts.schema,
            engine: InferenceEngine::new(artifacts.scaler, artifacts.classifier, threshold),
            missing_fill,
            metrics,
        }
    }

    /// Health probe descriptor
    pub fn health(&self) -> HealthStatus {
        HealthStatus::online(self.engine.model_name())
    }

    pub fn metrics(&self) -> &Arc<ScoringMetrics> {
        &self.metrics
    }

    /// Score a JSON-encoded predict request (NATS payloads)
    pub fn predict_json(&self, payload: &[u8]) -> Result<ScoreResult, PredictionError> {
        let request: PredictRequest = serde_json::from_slice(payload).map_err(|e| {
            self.metrics.record_rejection();
            ValidationError::InvalidPayload(e.to_string())
        })?;
        self.predict(&request)
    }

    /// Validate and score a predict request
    pub fn predict(&self, request: &PredictRequest) -> Result<ScoreResult, PredictionError> {
        let input = TransactionInput::from_features(&request.features).map_err(|e| {
            self.metrics.record_rejection();
            e
        })?;

        if !input.defaulted.is_empty() {
            debug!(fields = ?input.defaulted, "Request fields defaulted");
            self.metrics.record_defaulted_fields(&input.defaulted);
        }

        self.predict_transaction(&input.transaction)
    }

    /// Score an already validated transaction
    pub fn predict_transaction(&self, tx: &RawTransaction) -> Result<ScoreResult, PredictionError> {
        let start_time = Instant::now();

        let row = self.extractor.extract(tx);
        let assembled = self.schema.assemble(&row, self.missing_fill);

        if !assembled.missing.is_empty() {
            warn!(
                missing = ?assembled.missing,
                fill = ?self.missing_fill,
                "Schema columns absent from engineered row, filled with default"
            );
            self.metrics.record_schema_fills(&assembled.missing);
        }
        if !assembled.dropped.is_empty() {
            debug!(dropped = ?assembled.dropped, "Engineered features not in schema");
        }

        let result = self.engine.score(&assembled.vector).map_err(|e| {
            self.metrics.record_failure();
            e
        })?;

        let processing_time = start_time.elapsed();
        self.metrics
            .record_score(processing_time, result.fraud_probability, result.is_fraud());

        debug!(
            transaction_type = %tx.kind,
            fraud_probability = result.fraud_probability,
            is_fraud = result.is_fraud,
            processing_time_us = processing_time.as_micros(),
            "Transaction scored"
        );

        Ok(result)
    }
}
