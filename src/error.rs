//! Error types for request validation, scoring and artifact loading

use std::path::PathBuf;
use thiserror::Error;

/// A request that cannot be turned into a typed transaction.
///
/// Always the caller's fault; never converted into a default score.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed payload: {0}")]
    InvalidPayload(String),

    #[error("field `{field}` must be numeric, got {found}")]
    NotNumeric {
        field: &'static str,
        found: &'static str,
    },

    #[error("field `{field}` must be a finite number")]
    NotFinite { field: &'static str },

    #[error("field `{field}` must be an integer")]
    NotInteger { field: &'static str },

    #[error("field `type` must be a string, got {found}")]
    InvalidType { found: &'static str },
}

/// Failure inside the scaler or classifier for an otherwise valid request
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("feature vector has {found} values, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("classifier inference failed: {0}")]
    Inference(String),

    #[error("classifier returned an invalid probability: {0}")]
    InvalidProbability(f64),
}

/// Missing or inconsistent startup artifact. Fatal: the service must not start.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("feature schema is empty")]
    EmptySchema,

    #[error("feature schema lists `{0}` more than once")]
    DuplicateFeature(String),

    #[error("{artifact} has {found} dimensions, feature schema has {expected}")]
    DimensionMismatch {
        artifact: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("scaler was fit on different feature names than the feature schema")]
    SchemaMismatch,

    #[error("failed to load ONNX model {path}: {message}")]
    Onnx { path: PathBuf, message: String },

    #[error("unsupported classifier format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Error surfaced by the prediction service boundary
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl PredictionError {
    /// True when the error is the client's to fix
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictionError::Validation(_))
    }
}
