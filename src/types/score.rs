//! Scoring response structures

use serde::{Deserialize, Serialize};

/// Outcome of scoring one transaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Class-1 probability from the classifier (0.0 - 1.0)
    pub fraud_probability: f64,

    /// 1 when `fraud_probability >= threshold`, else 0
    pub is_fraud: u8,

    /// Decision cutoff the label was derived with
    pub threshold: f64,

    /// Always true: the classifier saw engineered features, not raw fields
    pub engineered_features_used: bool,
}

impl ScoreResult {
    /// Apply the decision rule to a probability
    pub fn from_probability(fraud_probability: f64, threshold: f64) -> Self {
        Self {
            fraud_probability,
            is_fraud: u8::from(fraud_probability >= threshold),
            threshold,
            engineered_features_used: true,
        }
    }

    pub fn is_fraud(&self) -> bool {
        self.is_fraud == 1
    }
}

/// Static descriptor returned by the health probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model: String,
}

impl HealthStatus {
    pub fn online(model: &str) -> Self {
        Self {
            status: "online".to_string(),
            model: model.to_string(),
        }
    }
}
