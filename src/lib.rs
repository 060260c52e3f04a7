//! Fraud Scoring Service Library
//!
//! Scores single mobile-money transactions for fraud: engineers the
//! training-time features, applies the fitted scaler and classifier, and
//! thresholds the fraud probability.

pub mod api;
pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use consumer::TransactionConsumer;
pub use error::{ArtifactError, PredictionError, ScoringError, ValidationError};
pub use feature_extractor::{EngineeredFeatureRow, FeatureExtractor};
pub use models::inference::InferenceEngine;
pub use producer::ScorePublisher;
pub use service::PredictionService;
pub use types::{score::ScoreResult, transaction::RawTransaction};
